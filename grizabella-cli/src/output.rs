//! Terminal output formatting: colored text for interactive use, structured
//! JSON for scripting (`--output json`).

use colored::*;
use grizabella_core::query::QueryResult;
use grizabella_core::types::{ObjectInstance, ObjectTypeDefinition, RelationInstance, RelationTypeDefinition};
use serde_json::json;

pub struct CliColors;

impl CliColors {
    pub fn success() -> Color {
        Color::TrueColor { r: 34, g: 197, b: 94 }
    }
    pub fn error() -> Color {
        Color::TrueColor { r: 239, g: 68, b: 68 }
    }
    pub fn warning() -> Color {
        Color::TrueColor { r: 245, g: 158, b: 11 }
    }
    pub fn info() -> Color {
        Color::TrueColor { r: 59, g: 130, b: 246 }
    }
    pub fn muted() -> Color {
        Color::TrueColor { r: 148, g: 163, b: 184 }
    }
}

pub fn format_success(msg: &str) -> ColoredString {
    msg.color(CliColors::success()).bold()
}

pub fn format_error(msg: &str) -> ColoredString {
    msg.color(CliColors::error()).bold()
}

pub fn format_warning(msg: &str) -> ColoredString {
    msg.color(CliColors::warning())
}

pub fn format_info(msg: &str) -> ColoredString {
    msg.color(CliColors::info())
}

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn output_error(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let body = json!({"error": true, "message": message});
            println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
        }
        OutputFormat::Text => {
            eprintln!("{} {}", format_error("error:"), message);
        }
    }
}

pub fn print_object_type(otd: &ObjectTypeDefinition, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(otd).unwrap_or_default()),
        OutputFormat::Text => {
            println!("{} {}", format_info("object type:"), otd.name.bold());
            for prop in &otd.properties {
                println!(
                    "  {} : {}{}{}",
                    prop.name,
                    prop.data_type.as_str().color(CliColors::muted()),
                    if prop.nullable { "" } else { " not null" },
                    if prop.unique { " unique" } else { "" }
                );
            }
        }
    }
}

pub fn print_relation_type(rtd: &RelationTypeDefinition, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rtd).unwrap_or_default()),
        OutputFormat::Text => {
            println!(
                "{} {} ({} -> {})",
                format_info("relation type:"),
                rtd.name.bold(),
                rtd.source_otds.join(","),
                rtd.target_otds.join(",")
            );
        }
    }
}

pub fn print_object(obj: &ObjectInstance, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(obj).unwrap_or_default()),
        OutputFormat::Text => {
            println!("{} {} ({})", format_success("object"), obj.id(), obj.object_type_name);
            for (name, value) in &obj.properties {
                println!("  {name} = {value:?}");
            }
        }
    }
}

pub fn print_object_list(objects: &[ObjectInstance], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(objects).unwrap_or_default()),
        OutputFormat::Text => {
            println!("{}", format_info(&format!("{} object(s)", objects.len())));
            for obj in objects {
                print_object(obj, format);
            }
        }
    }
}

pub fn print_relation(relation: &RelationInstance, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(relation).unwrap_or_default()),
        OutputFormat::Text => {
            println!(
                "{} {} {} --[{}]--> {}",
                format_success("relation"),
                relation.id(),
                relation.source_object_id,
                relation.relation_type_name,
                relation.target_object_id
            );
        }
    }
}

pub fn print_relation_list(relations: &[RelationInstance], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(relations).unwrap_or_default()),
        OutputFormat::Text => {
            println!("{}", format_info(&format!("{} relation(s)", relations.len())));
            for relation in relations {
                print_relation(relation, format);
            }
        }
    }
}

pub fn print_query_result(result: &QueryResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let body = json!({
                "objects": result.objects,
                "errors": result.errors.iter().map(|e| json!({
                    "object_type_name": e.object_type_name,
                    "message": e.message,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
        }
        OutputFormat::Text => {
            print_object_list(&result.objects, format);
            for err in &result.errors {
                println!("{} {}: {}", format_warning("component error"), err.object_type_name, err.message);
            }
        }
    }
}
