use chrono::Duration;
use comfy_table::{ContentArrangement, Table, presets::NOTHING};

use super::PodTable;

/// Compact age the way kubectl prints it: `45s`, `12m`, `3h4m`, `5d`, `2y3d`
pub fn human_duration(d: Duration) -> String {
    let seconds = d.num_seconds();
    if seconds < -1 {
        return "<invalid>".to_string();
    } else if seconds < 0 {
        return "0s".to_string();
    } else if seconds < 60 * 2 {
        return format!("{}s", seconds);
    }

    let minutes = d.num_minutes();
    if minutes < 10 {
        let s = seconds % 60;
        if s == 0 {
            return format!("{}m", minutes);
        }
        return format!("{}m{}s", minutes, s);
    } else if minutes < 60 * 3 {
        return format!("{}m", minutes);
    }

    let hours = d.num_hours();
    if hours < 8 {
        let m = minutes % 60;
        if m == 0 {
            return format!("{}h", hours);
        }
        format!("{}h{}m", hours, m)
    } else if hours < 48 {
        format!("{}h", hours)
    } else if hours < 24 * 8 {
        let h = hours % 24;
        if h == 0 {
            return format!("{}d", hours / 24);
        }
        format!("{}d{}h", hours / 24, h)
    } else if hours < 24 * 365 * 2 {
        format!("{}d", hours / 24)
    } else if hours < 24 * 365 * 8 {
        let days = (hours / 24) % 365;
        if days == 0 {
            return format!("{}y", hours / 24 / 365);
        }
        format!("{}y{}d", hours / 24 / 365, days)
    } else {
        format!("{}y", hours / 24 / 365)
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(table_data: &PodTable, no_headers: bool) -> String {
        let mut table = Table::new();
        // Borderless, like kubectl get
        table
            .load_preset(NOTHING)
            .set_content_arrangement(ContentArrangement::Disabled);

        if !no_headers {
            table.set_header(&table_data.columns);
        }
        for row in &table_data.rows {
            table.add_row(row);
        }
        for column in table.column_iter_mut() {
            column.set_padding((0, 3));
        }

        table
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
