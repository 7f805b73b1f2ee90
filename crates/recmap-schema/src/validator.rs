use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::schema::{parse_field_kind, SchemaFile, TypeConfig};

/// A single validation error with context about where it occurred.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Offending type, if known.
    pub type_name: Option<String>,
    /// Offending field, if known.
    pub field: Option<String>,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ctx = Vec::new();
        if let Some(t) = &self.type_name {
            ctx.push(format!("type={t}"));
        }
        if let Some(field) = &self.field {
            ctx.push(format!("field={field}"));
        }
        if ctx.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", ctx.join(", "), self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed table definition. Returns `Ok(())` if valid, or the
/// full list of errors.
///
/// This covers the declarative-source concerns (naming, type syntax,
/// structural flag placement); the core schema's own `build()` then enforces
/// the model invariants (key existence, single TTL, equals/hash-code
/// subsets).
pub fn validate_schema(schema: &SchemaFile) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if schema.table.name.is_empty() {
        errors.push(ValidationError {
            type_name: None,
            field: None,
            message: "table.name must not be empty".into(),
        });
    }

    if schema.table.hash_key.is_empty() {
        errors.push(ValidationError {
            type_name: None,
            field: None,
            message: "table.hash_key must not be empty".into(),
        });
    }

    if schema.types.is_empty() {
        errors.push(ValidationError {
            type_name: None,
            field: None,
            message: "schema must define at least one type".into(),
        });
    }

    let declared: BTreeSet<&str> = schema.types.iter().map(|t| t.name.as_str()).collect();

    let mut type_names = HashSet::new();
    for ty in &schema.types {
        if !type_names.insert(&ty.name) {
            errors.push(ValidationError {
                type_name: Some(ty.name.clone()),
                field: None,
                message: "duplicate type name".into(),
            });
        }
        validate_type(ty, &declared, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_type(ty: &TypeConfig, declared: &BTreeSet<&str>, errors: &mut Vec<ValidationError>) {
    // Type names are PascalCase (start with uppercase).
    if ty.name.is_empty()
        || !ty
            .name
            .chars()
            .next()
            .unwrap_or('a')
            .is_ascii_uppercase()
    {
        errors.push(ValidationError {
            type_name: Some(ty.name.clone()),
            field: None,
            message: "type name must be PascalCase (start with uppercase)".into(),
        });
    }

    if ty.fields.is_empty() {
        errors.push(ValidationError {
            type_name: Some(ty.name.clone()),
            field: None,
            message: "type must have at least one field".into(),
        });
        return;
    }

    let mut field_names = HashSet::new();
    for field in &ty.fields {
        if !field_names.insert(field.name.clone()) {
            errors.push(ValidationError {
                type_name: Some(ty.name.clone()),
                field: Some(field.name.clone()),
                message: "duplicate field name".into(),
            });
        }

        // Field names are snake_case (start with lowercase).
        if field.name.is_empty()
            || field
                .name
                .chars()
                .next()
                .unwrap_or('A')
                .is_ascii_uppercase()
        {
            errors.push(ValidationError {
                type_name: Some(ty.name.clone()),
                field: Some(field.name.clone()),
                message: "field name must be snake_case (start with lowercase)".into(),
            });
        }

        let kind = parse_field_kind(&field.field_type, declared);
        match &kind {
            None => errors.push(ValidationError {
                type_name: Some(ty.name.clone()),
                field: Some(field.name.clone()),
                message: format!("unsupported type `{}`", field.field_type),
            }),
            Some(kind) => {
                if field.keyed_by.is_some() && !matches!(kind, recmap::FieldKind::List(_)) {
                    errors.push(ValidationError {
                        type_name: Some(ty.name.clone()),
                        field: Some(field.name.clone()),
                        message: "keyed_by applies only to list fields".into(),
                    });
                }
                if field.compress && !kind.is_collection() {
                    errors.push(ValidationError {
                        type_name: Some(ty.name.clone()),
                        field: Some(field.name.clone()),
                        message: "compress applies only to collection fields".into(),
                    });
                }
                if field.ttl && *kind != recmap::FieldKind::Number {
                    errors.push(ValidationError {
                        type_name: Some(ty.name.clone()),
                        field: Some(field.name.clone()),
                        message: "ttl field must be a number (epoch seconds)".into(),
                    });
                }
            }
        }
    }
}
