//! Table rendering for command output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use repipe_config::{ConfigValue, InstanceDescriptor, Serializable};
use repipe_mapper::{ClassCoverageMapper, LabelMode};
use repipe_pipeline::{ComponentRegistry, FieldValue, Pipeline};
use serde_json::json;

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_header(headers.iter().map(|text| header_cell(text)).collect::<Vec<_>>());
    apply_table_style(&mut table);
    table
}

fn align_right(table: &mut Table, columns: &[usize]) {
    for &index in columns {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

/// Class identifiers known to `registry`, grouped by their module prefix.
pub fn components_table(registry: &ComponentRegistry) -> Table {
    let mut table = new_table(&["Component", "Module"]);
    for class in registry.class_names() {
        let (module, name) = class.rsplit_once('.').unwrap_or(("", class));
        table.add_row(vec![Cell::new(name), Cell::new(module).fg(Color::DarkGrey)]);
    }
    table
}

fn descriptor(value: &ConfigValue) -> Option<InstanceDescriptor> {
    InstanceDescriptor::from_value(value).ok().flatten()
}

fn short_class(class: &str) -> &str {
    class.rsplit_once('.').map_or(class, |(_, name)| name)
}

fn string_list(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(text) => text.clone(),
        ConfigValue::Array(items) => items
            .iter()
            .filter_map(ConfigValue::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

/// One row per step of a pipeline configuration.
pub fn steps_table(pipeline: &Pipeline) -> Table {
    let mut table = new_table(&["#", "Step", "Transform", "Inputs", "Output"]);
    align_right(&mut table, &[0]);
    let config = pipeline.to_dict();
    let steps = descriptor(&config)
        .and_then(|pipeline| pipeline.params.get("steps").cloned())
        .and_then(|steps| steps.as_array().cloned())
        .unwrap_or_default();
    for (index, step) in steps.iter().enumerate() {
        let Some(step) = descriptor(step) else {
            continue;
        };
        let params = &step.params;
        let routed = (params.get("transform"), params.get("features"));
        let (transform, inputs, output) = match routed {
            (Some(transform), _) => (
                descriptor(transform)
                    .map(|inner| short_class(&inner.cls).to_string())
                    .unwrap_or_default(),
                params.get("in_fields").map(string_list).unwrap_or_default(),
                params.get("out_field").map(string_list).unwrap_or_default(),
            ),
            (None, Some(features)) => (
                String::new(),
                string_list(features),
                "features".to_string(),
            ),
            (None, None) => (String::new(), String::new(), String::new()),
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(short_class(&step.cls)).fg(Color::Cyan),
            Cell::new(transform),
            Cell::new(inputs),
            Cell::new(output),
        ]);
    }
    table
}

/// Kind and shape of every feature.
pub fn features_table(features: &[FieldValue]) -> Table {
    let mut table = new_table(&["#", "Kind", "Shape"]);
    align_right(&mut table, &[0]);
    for (index, feature) in features.iter().enumerate() {
        let shape = feature
            .shape()
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(" x ");
        table.add_row(vec![
            Cell::new(index),
            Cell::new(feature.kind()),
            Cell::new(shape),
        ]);
    }
    table
}

fn mode_label(mode: LabelMode) -> &'static str {
    match mode {
        LabelMode::SingleLabel => "single-label",
        LabelMode::MultiLabel => "multi-label",
    }
}

/// Retained classes per output head.
pub fn coverage_table(mapper: &ClassCoverageMapper) -> Table {
    let mut table = new_table(&["Head", "Mode", "Kept", "Classes", "Mean F1", "Coverage"]);
    align_right(&mut table, &[2, 3, 4, 5]);
    for (head, mode) in mapper.heads() {
        let (Some(table_for_head), Some(selection)) = (mapper.table(head), mapper.selection(head))
        else {
            continue;
        };
        table.add_row(vec![
            Cell::new(head).fg(Color::Cyan),
            Cell::new(mode_label(mode)),
            Cell::new(selection.classes),
            Cell::new(table_for_head.len()),
            Cell::new(format!("{:.4}", selection.mean_f1)),
            Cell::new(selection.coverage),
        ]);
    }
    table
}

/// Machine-readable form of [`coverage_table`].
pub fn coverage_summary(mapper: &ClassCoverageMapper) -> ConfigValue {
    let heads: Vec<ConfigValue> = mapper
        .heads()
        .filter_map(|(head, mode)| {
            let table = mapper.table(head)?;
            let selection = table.selection();
            Some(json!({
                "head": head,
                "mode": mode_label(mode),
                "kept": selection.classes,
                "classes": table.len(),
                "mean_f1": selection.mean_f1,
                "coverage": selection.coverage,
            }))
        })
        .collect();
    json!({
        "mean_f1": mapper.mean_f1(),
        "fallback_class": mapper.fallback_class(),
        "heads": heads,
    })
}

/// Every class of one head with the class it is reported as.
pub fn classes_table(mapper: &ClassCoverageMapper, head: &str) -> Option<Table> {
    let coverage = mapper.table(head)?;
    let mut table = new_table(&["ID", "Class", "F1", "Support", "Reported as"]);
    align_right(&mut table, &[0, 2, 3]);
    for entry in coverage.entries() {
        let reported = if entry.is_kept() {
            Cell::new(&entry.mapped_to_class).fg(Color::Green)
        } else {
            Cell::new(&entry.mapped_to_class).fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(entry.record.class_id),
            Cell::new(&entry.record.class_name),
            Cell::new(format!("{:.3}", entry.record.f1_score)),
            Cell::new(entry.record.support),
            reported,
        ]);
    }
    Some(table)
}
