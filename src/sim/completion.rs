//! Reporting a finished procedure to the page hosting the simulation.
//!
//! Hosts embed the simulation in an iframe. Course players expose
//! `GetPlayer().SetVar(..)` on the parent window; everything else receives a
//! `{ type: "SIM_COMPLETE" }` message.

use super::error::SimError;
use tracing::{info, warn};

pub(super) const COMPLETION_VARIABLE: &str = "SimComplete";
pub(super) const COMPLETION_MESSAGE_TYPE: &str = "SIM_COMPLETE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CompletionChannel {
    HostApi,
    PostMessage,
    Unreported,
}

/// Tries the preferred channel first and falls back to the generic one when
/// it is unavailable or fails. Errors from the preferred path never escape.
pub(super) fn report_completion(
    preferred: impl FnOnce() -> Result<(), SimError>,
    fallback: impl FnOnce() -> Result<(), SimError>,
) -> CompletionChannel {
    match preferred() {
        Ok(()) => return CompletionChannel::HostApi,
        Err(SimError::HostApiUnavailable) => {
            info!("host completion API not found, using message fallback");
        }
        Err(err) => warn!("host completion API failed, using message fallback: {err}"),
    }

    match fallback() {
        Ok(()) => CompletionChannel::PostMessage,
        Err(err) => {
            warn!("completion message could not be delivered: {err}");
            CompletionChannel::Unreported
        }
    }
}

pub(super) fn notify_host_completion() -> CompletionChannel {
    report_completion(host::set_completion_variable, host::post_completion_message)
}

#[cfg(target_arch = "wasm32")]
mod host {
    use super::{COMPLETION_MESSAGE_TYPE, COMPLETION_VARIABLE};
    use crate::sim::error::SimError;
    use js_sys::{Function, Object, Reflect};
    use wasm_bindgen::{JsCast, JsValue};

    fn parent_window() -> Result<web_sys::Window, SimError> {
        let window = web_sys::window()
            .ok_or_else(|| SimError::HostBridge("window object not available".to_string()))?;
        window
            .parent()
            .map_err(js_error)?
            .ok_or_else(|| SimError::HostBridge("no parent window".to_string()))
    }

    fn js_error(value: JsValue) -> SimError {
        SimError::HostBridge(format!("{value:?}"))
    }

    fn method(target: &JsValue, name: &str) -> Result<Option<Function>, SimError> {
        let value = Reflect::get(target, &JsValue::from_str(name)).map_err(js_error)?;
        Ok(value.dyn_into::<Function>().ok())
    }

    pub(super) fn set_completion_variable() -> Result<(), SimError> {
        let parent: JsValue = parent_window()?.into();
        let Some(get_player) = method(&parent, "GetPlayer")? else {
            return Err(SimError::HostApiUnavailable);
        };
        let player = get_player.call0(&parent).map_err(js_error)?;
        if player.is_null() || player.is_undefined() {
            return Err(SimError::HostApiUnavailable);
        }
        let Some(set_var) = method(&player, "SetVar")? else {
            return Err(SimError::HostApiUnavailable);
        };
        set_var
            .call2(&player, &JsValue::from_str(COMPLETION_VARIABLE), &JsValue::TRUE)
            .map_err(js_error)?;
        Ok(())
    }

    pub(super) fn post_completion_message() -> Result<(), SimError> {
        let parent = parent_window()?;
        let message = Object::new();
        Reflect::set(
            &message,
            &JsValue::from_str("type"),
            &JsValue::from_str(COMPLETION_MESSAGE_TYPE),
        )
        .map_err(js_error)?;
        parent.post_message(&message, "*").map_err(js_error)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod host {
    use super::{COMPLETION_MESSAGE_TYPE, COMPLETION_VARIABLE};
    use crate::sim::error::SimError;
    use tracing::info;

    pub(super) fn set_completion_variable() -> Result<(), SimError> {
        Err(SimError::HostApiUnavailable)
    }

    pub(super) fn post_completion_message() -> Result<(), SimError> {
        info!(
            variable = COMPLETION_VARIABLE,
            message = COMPLETION_MESSAGE_TYPE,
            "no hosting page, completion logged"
        );
        Ok(())
    }
}
