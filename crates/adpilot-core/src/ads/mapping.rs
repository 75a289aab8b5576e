//! Static lookup tables from form labels to Marketing API codes.

use serde::{Deserialize, Serialize};

/// Campaign goal as offered to the user, with its API objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignObjective {
    Awareness,
    Conversions,
    Traffic,
    AppInstalls,
    LeadGeneration,
}

impl CampaignObjective {
    pub const ALL: [CampaignObjective; 5] = [
        CampaignObjective::Awareness,
        CampaignObjective::Conversions,
        CampaignObjective::Traffic,
        CampaignObjective::AppInstalls,
        CampaignObjective::LeadGeneration,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Awareness => "Awareness",
            Self::Conversions => "Conversions",
            Self::Traffic => "Traffic",
            Self::AppInstalls => "App Installs",
            Self::LeadGeneration => "Lead Generation",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Awareness => "REACH",
            Self::Conversions => "CONVERSIONS",
            Self::Traffic => "LINK_CLICKS",
            Self::AppInstalls => "APP_INSTALLS",
            Self::LeadGeneration => "LEAD_GENERATION",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|o| o.label().eq_ignore_ascii_case(wanted))
    }
}

/// Objective code for a goal label; `None` when the label is not in the table.
pub fn objective_code(label: &str) -> Option<&'static str> {
    CampaignObjective::from_label(label).map(CampaignObjective::code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallToAction {
    LearnMore,
    ShopNow,
    SignUp,
    BookNow,
    Download,
}

impl CallToAction {
    pub const ALL: [CallToAction; 5] = [
        CallToAction::LearnMore,
        CallToAction::ShopNow,
        CallToAction::SignUp,
        CallToAction::BookNow,
        CallToAction::Download,
    ];

    /// Used for any label the table does not know.
    pub const FALLBACK: CallToAction = CallToAction::LearnMore;

    pub fn label(self) -> &'static str {
        match self {
            Self::LearnMore => "Learn More",
            Self::ShopNow => "Shop Now",
            Self::SignUp => "Sign Up",
            Self::BookNow => "Book Now",
            Self::Download => "Download",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::LearnMore => "LEARN_MORE",
            Self::ShopNow => "SHOP_NOW",
            Self::SignUp => "SIGN_UP",
            Self::BookNow => "BOOK_TRAVEL",
            Self::Download => "DOWNLOAD",
        }
    }

    /// Accepts a form label or an API code.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL.into_iter().find(|cta| {
            cta.label().eq_ignore_ascii_case(wanted) || cta.code().eq_ignore_ascii_case(wanted)
        })
    }
}

/// CTA code for a label, falling back to `LEARN_MORE`.
pub fn call_to_action_code(label: &str) -> &'static str {
    CallToAction::from_label(label)
        .unwrap_or_else(|| {
            log::warn!(
                "Unknown call to action '{}', using {}",
                label,
                CallToAction::FALLBACK.code()
            );
            CallToAction::FALLBACK
        })
        .code()
}
