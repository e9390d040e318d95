use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::config::JobTemplate;

/// Configured job templates, one row each, in declaration order.
pub fn templates_table(templates: &[JobTemplate]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#"),
            Cell::new("Source job"),
            Cell::new("Feature branch job"),
        ]);
    for (index, template) in templates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).fg(TableColor::DarkGrey),
            Cell::new(&template.source_job),
            Cell::new(&template.feature_branch_job).fg(TableColor::Cyan),
        ]);
    }
    table
}
