// privacy-backend/src/features/consent/models/policy.rs

use super::user_consent::ConsentType;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalBasis {
    Consent,
    Contract,
    LegitimateInterest,
    LegalObligation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsentRequirement {
    pub consent_type: ConsentType,
    pub required: bool,
    pub legal_basis: LegalBasis,
}

const REQUIRED_CONSENTS: [ConsentRequirement; 5] = [
    ConsentRequirement {
        consent_type: ConsentType::DataProcessing,
        required: true,
        legal_basis: LegalBasis::Contract,
    },
    ConsentRequirement {
        consent_type: ConsentType::Marketing,
        required: false,
        legal_basis: LegalBasis::Consent,
    },
    ConsentRequirement {
        consent_type: ConsentType::Analytics,
        required: false,
        legal_basis: LegalBasis::LegitimateInterest,
    },
    ConsentRequirement {
        consent_type: ConsentType::ThirdPartySharing,
        required: false,
        legal_basis: LegalBasis::Consent,
    },
    ConsentRequirement {
        consent_type: ConsentType::Cookies,
        required: false,
        legal_basis: LegalBasis::Consent,
    },
];

/// 同意種別ごとの必須/法的根拠の静的テーブル
pub fn required_consent_table() -> &'static [ConsentRequirement] {
    &REQUIRED_CONSENTS
}

pub fn requirement_for(consent_type: ConsentType) -> ConsentRequirement {
    REQUIRED_CONSENTS
        .iter()
        .copied()
        .find(|r| r.consent_type == consent_type)
        .unwrap_or(ConsentRequirement {
            consent_type,
            required: false,
            legal_basis: LegalBasis::Consent,
        })
}
