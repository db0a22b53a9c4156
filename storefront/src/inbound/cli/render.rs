//! JSON reports printed by the command-line driver.

use serde::Serialize;

use crate::domain::action_gate::{self, ActionControl, GatedAction};
use crate::domain::{
    Capabilities, GuardDecision, Identity, Locale, RequiredCapability, RouteTable, Session, View,
};

/// Snapshot of the session as printed by `whoami`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport<'a> {
    state: &'static str,
    generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<&'a Identity>,
    capabilities: Capabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> SessionReport<'a> {
    /// Describe `session`, localising any stored fetch error.
    pub fn new(session: &'a Session, locale: Locale) -> Self {
        Self {
            state: session.state().label(),
            generation: session.generation(),
            identity: session.identity(),
            capabilities: session.capabilities(),
            error: session.error().map(|error| error.user_message(locale)),
        }
    }
}

/// One gated action and how its control is presented.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionReport {
    action: GatedAction,
    required: RequiredCapability,
    control: ActionControl,
}

/// Controls for every gated action under `capabilities`.
pub fn action_reports(capabilities: Capabilities) -> Vec<ActionReport> {
    GatedAction::ALL
        .into_iter()
        .map(|action| ActionReport {
            action,
            required: action.required(),
            control: action_gate::control(action, capabilities),
        })
        .collect()
}

/// One route and its guard outcome for the current session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteReport<'a> {
    pattern: &'a str,
    view: View,
    required: RequiredCapability,
    decision: GuardDecision,
}

/// Guard outcome of every registered route.
pub fn route_reports<'a>(table: &'a RouteTable, session: &Session) -> Vec<RouteReport<'a>> {
    table
        .routes()
        .iter()
        .map(|route| RouteReport {
            pattern: route.pattern.as_str(),
            view: route.view,
            required: route.required,
            decision: crate::domain::guard::decide(route.required, session),
        })
        .collect()
}
