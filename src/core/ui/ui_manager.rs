//=========================================================================
// UI Manager
//=========================================================================
//
// Owns the popup stack and the non-modal scene UI.
//
// Architecture:
//   UiManager
//     ├─ popups: Shared<PopupStack>
//     ├─ scene_ui: Option<Asset>
//     ├─ resources: Shared<ResourceManager>   (asset lookup)
//     └─ gate: TransitionGate                 (scene busy flag)
//
// Popups are never opened while a scene transition runs, and a started
// transition closes every open popup on the next tick.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::rc::Rc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{error, info, warn};

//=== Internal Dependencies ===============================================

use super::{PopupEvent, PopupHandle, PopupId, PopupStack};
use crate::core::lifecycle::{shared, Shared, Subsystem, SubsystemKind};
use crate::core::resources::{Asset, AssetKind, ResourceManager};
use crate::core::scene::TransitionGate;
use crate::core::task::{Step, StepResult};

const POPUP_PREFIX: &str = "UI/Popup/";
const SCENE_UI_PREFIX: &str = "UI/Scene/";

//=== UiManager ===========================================================

pub struct UiManager {
    resources: Shared<ResourceManager>,
    gate: TransitionGate,
    popups: Shared<PopupStack>,
    scene_ui: Option<Asset>,
    seen_transitions: u64,
}

impl UiManager {
    pub fn new(resources: Shared<ResourceManager>, gate: TransitionGate) -> Self {
        Self {
            resources,
            gate,
            popups: shared(PopupStack::new()),
            scene_ui: None,
            seen_transitions: 0,
        }
    }

    //--- Popups -----------------------------------------------------------

    /// Opens the popup prefab `UI/Popup/<name>` on top of the stack.
    ///
    /// Refused while a scene transition runs. A missing prefab is logged
    /// and yields `None`.
    pub fn show_popup(&mut self, name: &str) -> Option<PopupHandle> {
        if self.gate.is_busy() {
            warn!("[UIManager] Popup '{}' refused: scene transition in progress", name);
            return None;
        }

        let path = format!("{POPUP_PREFIX}{name}");
        if self.resources.borrow_mut().load(&path, AssetKind::Prefab).is_none() {
            error!("[UIManager] Popup prefab missing: {}", path);
            return None;
        }

        let id = self.popups.borrow_mut().push(name);
        Some(PopupHandle::new(id, Rc::downgrade(&self.popups)))
    }

    pub fn close_popup(&mut self, id: PopupId) -> bool {
        self.popups.borrow_mut().close(id)
    }

    pub fn close_top_popup(&mut self) -> bool {
        self.popups.borrow_mut().close_top()
    }

    pub fn close_all_popups(&mut self) -> usize {
        self.popups.borrow_mut().close_all()
    }

    pub fn popup_count(&self) -> usize {
        self.popups.borrow().len()
    }

    pub fn top_popup(&self) -> Option<PopupId> {
        self.popups.borrow().top().map(|popup| popup.id)
    }

    pub fn subscribe_popups(&mut self) -> Receiver<PopupEvent> {
        self.popups.borrow_mut().subscribe()
    }

    //--- Scene UI ---------------------------------------------------------

    /// Replaces the scene UI with the prefab `UI/Scene/<name>`.
    ///
    /// On a missing prefab the current scene UI is kept.
    pub fn show_scene_ui(&mut self, name: &str) -> Option<Asset> {
        let path = format!("{SCENE_UI_PREFIX}{name}");
        let Some(asset) = self.resources.borrow_mut().load(&path, AssetKind::Prefab) else {
            error!("[UIManager] Scene UI prefab missing: {}", path);
            return None;
        };

        self.scene_ui = Some(asset.clone());
        Some(asset)
    }

    pub fn scene_ui(&self) -> Option<&Asset> {
        self.scene_ui.as_ref()
    }

    /// Closes every popup and drops the scene UI.
    pub fn clear_all_ui(&mut self) {
        let closed = self.close_all_popups();
        if closed > 0 || self.scene_ui.is_some() {
            info!("[UIManager] Cleared {} popups and the scene UI", closed);
        }
        self.scene_ui = None;
    }
}

impl Subsystem for UiManager {
    fn name(&self) -> &str {
        "UIManager"
    }

    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Manager
    }

    fn on_initialize(&mut self) -> StepResult {
        self.seen_transitions = self.gate.transitions_started();
        Ok(Step::Complete)
    }

    fn on_terminate(&mut self) -> StepResult {
        self.clear_all_ui();
        Ok(Step::Complete)
    }

    fn update(&mut self, _dt: Duration) {
        let started = self.gate.transitions_started();
        if started != self.seen_transitions {
            self.seen_transitions = started;
            let closed = self.close_all_popups();
            if closed > 0 {
                info!("[UIManager] Closed {} popups for scene change", closed);
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
