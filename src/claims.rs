//! Claim screen view state.
//!
//! The claim screen shows either the submission form or the verification
//! view for one selected claim. Transitions are a pure function of the
//! current view and an action.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClaimView {
    #[default]
    Form,
    Verifying {
        claim_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimAction {
    /// A claim was picked from the "verify others" list.
    SelectClaim(String),
    /// The verification view's back button.
    Back,
    /// The screen lost focus (tab switch).
    FocusLost,
    /// The submission form was sent.
    Submitted,
}

#[must_use]
pub fn reduce(view: ClaimView, action: ClaimAction) -> ClaimView {
    match (view, action) {
        (_, ClaimAction::SelectClaim(claim_id)) if !claim_id.trim().is_empty() => ClaimView::Verifying { claim_id },
        (view, ClaimAction::SelectClaim(_)) => view,
        (_, ClaimAction::Back | ClaimAction::FocusLost | ClaimAction::Submitted) => ClaimView::Form,
    }
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;
