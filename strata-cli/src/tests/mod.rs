//! Shared test harness modules for the Strata CLI.

use super::*;

mod helpers;
