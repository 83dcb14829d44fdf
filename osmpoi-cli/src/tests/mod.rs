//! Shared test harness modules for the osmpoi CLI.

use super::*;

mod helpers;
