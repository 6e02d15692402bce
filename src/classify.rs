//! HTTP status classification.
//!
//! Every request a loop makes goes through [`check_status`]. The caller
//! decides what [`Action::Skip`] and [`Action::Abort`] mean in context.
//!
//! | Status | Action | Logged |
//! |--------|--------|--------|
//! | 200 | Proceed | no |
//! | 201..=299 | Proceed | yes |
//! | 500 | Skip | yes |
//! | anything else | Abort | yes |

use crate::models::Action;
use tracing::{info, warn};

impl Action {
    /// Pure mapping from status code to action.
    pub fn from_status(status: u16) -> Action {
        if status == 500 {
            Action::Skip
        } else if status / 100 != 2 {
            Action::Abort
        } else {
            Action::Proceed
        }
    }
}

/// Classify `status` for a request to `url`, logging anything other than 200.
pub fn check_status(status: u16, url: &str) -> Action {
    let action = Action::from_status(status);
    match action {
        Action::Proceed if status == 200 => {}
        Action::Proceed => info!(status, %url, "Status code {} for {}, {}.", status, url, action),
        Action::Skip | Action::Abort => {
            warn!(status, %url, "Status code {} for {}, {}.", status, url, action)
        }
    }
    action
}
