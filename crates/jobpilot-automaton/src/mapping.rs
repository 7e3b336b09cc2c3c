use serde::{Deserialize, Serialize};

use crate::form::{DetectedForm, FieldKind, FormField};

/// The applicant data available for filling forms.
///
/// Credential material never lives here; this is name-and-contact data plus
/// document text, safe to hold in memory for the life of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// Local path of the resume document, for upload fields.
    #[serde(default)]
    pub resume_path: Option<String>,
    /// Plain-text resume body, used for cover-letter fields and match scoring.
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

impl ApplicantProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The value this profile supplies for a field role, if any.
    pub fn value_for(&self, kind: FieldKind) -> Option<String> {
        match kind {
            FieldKind::FirstName => Some(self.first_name.clone()),
            FieldKind::LastName => Some(self.last_name.clone()),
            FieldKind::FullName => Some(self.full_name()),
            FieldKind::Email => Some(self.email.clone()),
            FieldKind::Phone => self.phone.clone(),
            FieldKind::Location => self.location.clone(),
            FieldKind::LinkedIn => self.linkedin_url.clone(),
            FieldKind::Resume => self.resume_path.clone(),
            FieldKind::CoverLetter => self.cover_letter.clone(),
        }
    }
}

/// A field paired with the value to type into it.
#[derive(Debug, Clone)]
pub struct FieldWrite {
    pub field: FormField,
    pub value: String,
}

/// The fill plan for a detected form.
#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub writes: Vec<FieldWrite>,
    /// Required field roles the profile could not supply a value for.
    pub unmapped_required: Vec<FieldKind>,
}

/// Bind profile values to form fields, best-effort.
///
/// Fields the profile has no value for are left untouched; required roles
/// among them are reported so the caller can log the gap.
pub fn map_fields(form: &DetectedForm, profile: &ApplicantProfile) -> FieldPlan {
    let mut writes = Vec::with_capacity(form.fields.len());
    let mut unmapped_required = Vec::new();

    for field in &form.fields {
        match profile.value_for(field.kind) {
            Some(value) if !value.is_empty() => writes.push(FieldWrite {
                field: field.clone(),
                value,
            }),
            _ => {
                if field.kind.is_required() {
                    unmapped_required.push(field.kind);
                }
            }
        }
    }

    FieldPlan {
        writes,
        unmapped_required,
    }
}
