use jobpilot_core::types::PlatformId;
use once_cell::sync::Lazy;
use regex::Regex;

/// Semantic role of an application form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Resume,
    CoverLetter,
    Location,
    LinkedIn,
}

impl FieldKind {
    /// Substrings matched against a field's name/id/placeholder attributes.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            FieldKind::FirstName => &["first_name", "first-name", "firstname", "fname"],
            FieldKind::LastName => &["last_name", "last-name", "lastname", "lname"],
            FieldKind::FullName => &["full_name", "fullname", "your-name", "name"],
            FieldKind::Email => &["email", "e-mail"],
            FieldKind::Phone => &["phone", "mobile", "tel"],
            FieldKind::Resume => &["resume", "cv", "attachment"],
            FieldKind::CoverLetter => &["cover_letter", "cover-letter", "coverletter", "comments"],
            FieldKind::Location => &["location", "city", "address"],
            FieldKind::LinkedIn => &["linkedin", "linked-in"],
        }
    }

    /// Fields an application cannot reasonably be submitted without.
    pub fn is_required(&self) -> bool {
        matches!(self, FieldKind::Email | FieldKind::FullName)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::FirstName => "first_name",
            FieldKind::LastName => "last_name",
            FieldKind::FullName => "full_name",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Resume => "resume",
            FieldKind::CoverLetter => "cover_letter",
            FieldKind::Location => "location",
            FieldKind::LinkedIn => "linkedin",
        }
    }

    fn all() -> &'static [FieldKind] {
        &[
            FieldKind::FirstName,
            FieldKind::LastName,
            FieldKind::Email,
            FieldKind::Phone,
            FieldKind::Resume,
            FieldKind::CoverLetter,
            FieldKind::Location,
            FieldKind::LinkedIn,
            // FullName last: its "name" keyword matches almost anything.
            FieldKind::FullName,
        ]
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete field on a detected form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub kind: FieldKind,
    /// CSS selector that locates the field on the page.
    pub selector: String,
}

/// A form the automaton knows how to fill, either from a platform-specific
/// signature or from the generic heuristic scan.
#[derive(Debug, Clone)]
pub struct DetectedForm {
    pub fields: Vec<FormField>,
    /// Selector for the submit control.
    pub submit: String,
    /// Selector whose appearance confirms the submission went through.
    pub success: String,
}

/// A known application-form layout for a specific platform.
#[derive(Debug, Clone)]
pub struct FormSignature {
    pub platform: PlatformId,
    /// Selector that must be present for this signature to apply.
    pub probe: String,
    pub fields: Vec<FormField>,
    pub submit: String,
    pub success: String,
}

impl FormSignature {
    fn greenhouse() -> Self {
        FormSignature {
            platform: PlatformId::new("greenhouse").expect("static platform id"),
            probe: "#application_form".to_string(),
            fields: vec![
                FormField {
                    kind: FieldKind::FirstName,
                    selector: "#first_name".to_string(),
                },
                FormField {
                    kind: FieldKind::LastName,
                    selector: "#last_name".to_string(),
                },
                FormField {
                    kind: FieldKind::Email,
                    selector: "#email".to_string(),
                },
                FormField {
                    kind: FieldKind::Phone,
                    selector: "#phone".to_string(),
                },
                FormField {
                    kind: FieldKind::CoverLetter,
                    selector: "#cover_letter_text".to_string(),
                },
            ],
            submit: "#submit_app".to_string(),
            success: "#application_confirmation".to_string(),
        }
    }

    fn lever() -> Self {
        FormSignature {
            platform: PlatformId::new("lever").expect("static platform id"),
            probe: "#application-form".to_string(),
            fields: vec![
                FormField {
                    kind: FieldKind::FullName,
                    selector: "input[name=\"name\"]".to_string(),
                },
                FormField {
                    kind: FieldKind::Email,
                    selector: "input[name=\"email\"]".to_string(),
                },
                FormField {
                    kind: FieldKind::Phone,
                    selector: "input[name=\"phone\"]".to_string(),
                },
                FormField {
                    kind: FieldKind::Location,
                    selector: "input[name=\"location\"]".to_string(),
                },
                FormField {
                    kind: FieldKind::CoverLetter,
                    selector: "textarea[name=\"comments\"]".to_string(),
                },
            ],
            submit: "#btn-submit".to_string(),
            success: ".application-confirmation".to_string(),
        }
    }
}

/// The set of platform-specific form layouts the automaton tries before
/// falling back to the generic scan.
#[derive(Debug, Clone)]
pub struct FormStrategySet {
    signatures: Vec<FormSignature>,
}

impl FormStrategySet {
    /// Signatures for the platforms with stable, well-known form layouts.
    pub fn builtin() -> Self {
        FormStrategySet {
            signatures: vec![FormSignature::greenhouse(), FormSignature::lever()],
        }
    }

    /// An empty set; every page goes through the generic scan.
    pub fn empty() -> Self {
        FormStrategySet {
            signatures: Vec::new(),
        }
    }

    pub fn push(&mut self, signature: FormSignature) {
        self.signatures.push(signature);
    }

    /// Signatures registered for the given platform.
    pub fn for_platform<'a>(
        &'a self,
        platform: &'a PlatformId,
    ) -> impl Iterator<Item = &'a FormSignature> + 'a {
        self.signatures.iter().filter(move |s| &s.platform == platform)
    }
}

static INPUT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(input|textarea|select)\b[^>]*>").expect("valid input tag regex")
});

static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(name|id|placeholder|type)\s*=\s*["']([^"']*)["']"#)
        .expect("valid attribute regex")
});

/// Scan raw page HTML for something that looks like an application form.
///
/// Returns `None` when no field worth filling is found, which the automaton
/// reports as a skip rather than a failure.
pub fn detect_generic(html: &str) -> Option<DetectedForm> {
    let mut fields: Vec<FormField> = Vec::new();
    let mut seen_kinds: Vec<FieldKind> = Vec::new();
    let mut has_submit_input = false;

    for tag in INPUT_TAG.find_iter(html) {
        let tag_text = tag.as_str();
        let mut name_attr: Option<String> = None;
        let mut id_attr: Option<String> = None;
        let mut haystack = String::new();
        let mut input_type = String::new();

        for cap in ATTR.captures_iter(tag_text) {
            let key = cap[1].to_ascii_lowercase();
            let value = cap[2].to_string();
            match key.as_str() {
                "name" => name_attr = Some(value.clone()),
                "id" => id_attr = Some(value.clone()),
                "type" => input_type = value.to_ascii_lowercase(),
                _ => {}
            }
            haystack.push_str(&value.to_ascii_lowercase());
            haystack.push(' ');
        }

        if input_type == "submit" {
            has_submit_input = true;
            continue;
        }
        if matches!(input_type.as_str(), "hidden" | "checkbox" | "radio") {
            continue;
        }

        let Some(kind) = classify(&haystack) else {
            continue;
        };
        if seen_kinds.contains(&kind) {
            continue;
        }

        // Prefer id selectors; fall back to attribute-contains on the name.
        let selector = match (&id_attr, &name_attr) {
            (Some(id), _) if !id.is_empty() => format!("#{id}"),
            (_, Some(name)) if !name.is_empty() => {
                format!("[name=\"{name}\"]")
            }
            _ => continue,
        };

        seen_kinds.push(kind);
        fields.push(FormField { kind, selector });
    }

    if fields.is_empty() {
        return None;
    }

    let submit = if has_submit_input {
        "input[type=\"submit\"]".to_string()
    } else {
        "button[type=\"submit\"]".to_string()
    };

    Some(DetectedForm {
        fields,
        submit,
        // Class-contains match on the usual confirmation wrappers.
        success: "[class*=\"confirmation\"], [class*=\"success\"], [class*=\"thank\"]".to_string(),
    })
}

fn classify(haystack: &str) -> Option<FieldKind> {
    for kind in FieldKind::all() {
        for keyword in kind.keywords() {
            if haystack.contains(keyword) {
                return Some(*kind);
            }
        }
    }
    None
}

impl From<&FormSignature> for DetectedForm {
    fn from(signature: &FormSignature) -> Self {
        DetectedForm {
            fields: signature.fields.clone(),
            submit: signature.submit.clone(),
            success: signature.success.clone(),
        }
    }
}
