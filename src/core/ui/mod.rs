//=========================================================================
// UI
//=========================================================================
//
// Modal popup stack and the manager that layers it above scene UI.
//
//=========================================================================

//=== Module Declarations =================================================

mod popup_stack;
mod ui_manager;

//=== Public API ==========================================================

pub use popup_stack::{Popup, PopupEvent, PopupHandle, PopupId, PopupStack, BASE_SORTING_ORDER};
pub use ui_manager::UiManager;
