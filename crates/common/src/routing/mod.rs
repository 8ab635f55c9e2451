//! Navigation intent routing
//!
//! A non-semantic pre-filter run before answer resolution: when a question
//! names a known panorama or project, the caller is sent straight to it.

use serde::{Deserialize, Serialize};

/// Kind of navigation intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Pano,
    Project,
    None,
}

/// Routing decision for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RouteDecision {
    pub fn none() -> Self {
        Self {
            intent: Intent::None,
            target: None,
        }
    }

    /// Whether the question bypasses answer resolution
    pub fn is_routed(&self) -> bool {
        self.intent != Intent::None
    }
}

/// Trait for intent routers
pub trait IntentRouter: Send + Sync {
    fn route(&self, question: &str, pano_names: &[String], project_names: &[String])
        -> RouteDecision;
}

/// Routes on whole-phrase, case-insensitive name mentions
///
/// Panorama names are checked before project names. Within a group the
/// longest mentioned name wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalIntentRouter;

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn mentions(haystack: &[String], name: &[String]) -> bool {
    !name.is_empty() && haystack.windows(name.len()).any(|window| window == name)
}

fn best_mention<'a>(question: &[String], names: &'a [String]) -> Option<&'a String> {
    names
        .iter()
        .filter(|name| mentions(question, &tokens(name)))
        .max_by_key(|name| name.trim().len())
}

impl IntentRouter for LexicalIntentRouter {
    fn route(
        &self,
        question: &str,
        pano_names: &[String],
        project_names: &[String],
    ) -> RouteDecision {
        let question = tokens(question);

        if let Some(name) = best_mention(&question, pano_names) {
            return RouteDecision {
                intent: Intent::Pano,
                target: Some(name.clone()),
            };
        }

        if let Some(name) = best_mention(&question, project_names) {
            return RouteDecision {
                intent: Intent::Project,
                target: Some(name.clone()),
            };
        }

        RouteDecision::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_routes_pano_before_project() {
        let router = LexicalIntentRouter;
        let decision = router.route(
            "Show me the Main Gate please",
            &names(&["Main Gate", "Library"]),
            &names(&["Main Gate Renovation"]),
        );
        assert_eq!(decision.intent, Intent::Pano);
        assert_eq!(decision.target.as_deref(), Some("Main Gate"));
    }

    #[test]
    fn test_routes_project_and_prefers_longest() {
        let router = LexicalIntentRouter;
        let decision = router.route(
            "what is the solar roof project?",
            &[],
            &names(&["Solar", "Solar Roof"]),
        );
        assert_eq!(decision.intent, Intent::Project);
        assert_eq!(decision.target.as_deref(), Some("Solar Roof"));
    }

    #[test]
    fn test_requires_whole_words() {
        let router = LexicalIntentRouter;
        let decision = router.route("libraryfees", &names(&["Library"]), &[]);
        assert!(!decision.is_routed());
    }

    #[test]
    fn test_none_serializes_without_target() {
        let json = serde_json::to_value(RouteDecision::none()).unwrap();
        assert_eq!(json, serde_json::json!({ "intent": "none" }));
    }
}
