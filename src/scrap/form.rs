//! Scrap Report Form
//!
//! Field state for one scrap report. The part control is only usable once a
//! program is chosen; validation reports every missing required field by its
//! display name.

use std::collections::BTreeSet;

use crate::model::{LineId, ScrapReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormField {
    Line,
    Program,
    PartNumber,
    DefectCode,
    DefectDescription,
}

impl FormField {
    pub const REQUIRED: [FormField; 5] = [
        FormField::Line,
        FormField::Program,
        FormField::PartNumber,
        FormField::DefectCode,
        FormField::DefectDescription,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            FormField::Line => "Line",
            FormField::Program => "Program",
            FormField::PartNumber => "Part Number",
            FormField::DefectCode => "Defect Code",
            FormField::DefectDescription => "Description",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapForm {
    line: Option<LineId>,
    program: Option<String>,
    part_number: Option<String>,
    part_enabled: bool,
    defect_code: Option<String>,
    defect_description: Option<String>,
    comments: String,
    invalid: BTreeSet<FormField>,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl ScrapForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> Option<LineId> {
        self.line
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    pub fn part_number(&self) -> Option<&str> {
        self.part_number.as_deref()
    }

    pub fn part_enabled(&self) -> bool {
        self.part_enabled
    }

    pub fn defect_code(&self) -> Option<&str> {
        self.defect_code.as_deref()
    }

    pub fn defect_description(&self) -> Option<&str> {
        self.defect_description.as_deref()
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn is_invalid(&self, field: FormField) -> bool {
        self.invalid.contains(&field)
    }

    pub fn set_line(&mut self, line: Option<LineId>) {
        self.line = line;
        self.invalid.remove(&FormField::Line);
    }

    /// Choose a program. Any previously chosen part is cleared; the part
    /// control is enabled only when a program is set.
    pub fn set_program(&mut self, program: &str) {
        self.program = non_blank(program);
        self.part_number = None;
        self.part_enabled = self.program.is_some();
        self.invalid.remove(&FormField::Program);
    }

    /// Returns `false` when the part control is disabled.
    pub fn set_part_number(&mut self, part_number: &str) -> bool {
        if !self.part_enabled {
            return false;
        }
        self.part_number = non_blank(part_number);
        self.invalid.remove(&FormField::PartNumber);
        true
    }

    pub fn set_defect_code(&mut self, code: &str) {
        self.defect_code = non_blank(code);
        self.invalid.remove(&FormField::DefectCode);
    }

    pub fn set_defect_description(&mut self, description: &str) {
        self.defect_description = non_blank(description);
        self.invalid.remove(&FormField::DefectDescription);
    }

    pub fn set_comments(&mut self, comments: &str) {
        self.comments = comments.to_string();
    }

    fn value_of(&self, field: FormField) -> bool {
        match field {
            FormField::Line => self.line.is_some(),
            FormField::Program => self.program.is_some(),
            FormField::PartNumber => self.part_number.is_some(),
            FormField::DefectCode => self.defect_code.is_some(),
            FormField::DefectDescription => self.defect_description.is_some(),
        }
    }

    /// Build the report, or mark and return the missing required fields.
    pub fn validate(&mut self) -> Result<ScrapReport, Vec<FormField>> {
        let missing: Vec<FormField> = FormField::REQUIRED
            .iter()
            .copied()
            .filter(|field| !self.value_of(*field))
            .collect();
        self.invalid = missing.iter().copied().collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(ScrapReport {
            line: self.line.map(|l| l.number().to_string()).unwrap_or_default(),
            program: self.program.clone().unwrap_or_default(),
            part_number: self.part_number.clone().unwrap_or_default(),
            defect_code: self.defect_code.clone().unwrap_or_default(),
            defect_description: self.defect_description.clone().unwrap_or_default(),
            comments: self.comments.clone(),
        })
    }

    /// Clear every field and disable the part control.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// "Please fill in all required fields: ..." message for `missing`.
pub fn missing_fields_message(missing: &[FormField]) -> String {
    let names: Vec<&str> = missing.iter().map(|f| f.display_name()).collect();
    format!("Please fill in all required fields: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_control_follows_program() {
        let mut form = ScrapForm::new();
        assert!(!form.set_part_number("4410"));

        form.set_program("P100");
        assert!(form.part_enabled());
        assert!(form.set_part_number("4410"));

        form.set_program("  ");
        assert!(!form.part_enabled());
        assert_eq!(form.part_number(), None);
    }

    #[test]
    fn test_validation_lists_missing_fields() {
        let mut form = ScrapForm::new();
        form.set_line(Some(LineId::Two));
        form.set_defect_code("D4");
        let missing = form.validate().unwrap_err();
        assert_eq!(
            missing,
            vec![FormField::Program, FormField::PartNumber, FormField::DefectDescription]
        );
        assert!(form.is_invalid(FormField::Program));
        assert_eq!(
            missing_fields_message(&missing),
            "Please fill in all required fields: Program, Part Number, Description"
        );

        form.set_program("P1");
        assert!(!form.is_invalid(FormField::Program));
    }

    #[test]
    fn test_valid_form_builds_report() {
        let mut form = ScrapForm::new();
        form.set_line(Some(LineId::One));
        form.set_program("P1");
        form.set_part_number("4410");
        form.set_defect_code("D1");
        form.set_defect_description("Crack");
        form.set_comments("edge chipped");

        let report = form.validate().unwrap();
        assert_eq!(report.line, "1");
        assert_eq!(report.comments, "edge chipped");

        form.reset();
        assert_eq!(form, ScrapForm::new());
    }
}
