//! Terminal formatting for the summary and monthly balance tables.

use super::{MonthlyBalance, Summary};

fn fmt_yen(v: f64) -> String {
    let rounded = v.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_yen).unwrap_or_else(|| "-".to_string())
}

pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str("=== fb - asset summary ===\n");
    match summary.latest_date {
        Some(date) => out.push_str(&format!("Latest date : {date}\n")),
        None => {
            out.push_str("No aggregated assets yet.\n");
            return out;
        }
    }
    out.push_str(&format!(
        "Total asset : {:>15}   target {:>15}\n",
        fmt_yen(summary.total_asset),
        fmt_opt(summary.target_asset)
    ));
    out.push_str(&format!(
        "Total return: {:>15}   target {:>15}\n",
        fmt_yen(summary.total_return),
        fmt_opt(summary.target_return)
    ));
    out
}

pub fn format_monthly_balance(rows: &[MonthlyBalance]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:<8} {:>13} {:>13} {:>13} {:>13} {:>13} {:>13}\n",
            "month", "type", "income", "expenditure", "net", "target net", "cumulative", "cum. target"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<10} {:-<8} {:-<13} {:-<13} {:-<13} {:-<13} {:-<13} {:-<13}",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<10} {:<8} {:>13} {:>13} {:>13} {:>13} {:>13} {:>13}",
                r.month_end.format("%Y-%m").to_string(),
                r.balance_type.as_str(),
                fmt_yen(r.income),
                fmt_yen(r.expenditure),
                fmt_yen(r.net),
                fmt_yen(r.target_net),
                r.cumulative_net.map(fmt_yen).unwrap_or_default(),
                r.cumulative_target_net.map(fmt_yen).unwrap_or_default(),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::BalanceType;

    #[test]
    fn yen_grouping() {
        assert_eq!(fmt_yen(0.0), "0");
        assert_eq!(fmt_yen(999.4), "999");
        assert_eq!(fmt_yen(1_234_567.0), "1,234,567");
        assert_eq!(fmt_yen(-40_000.0), "-40,000");
    }

    #[test]
    fn summary_without_data() {
        let s = Summary {
            latest_date: None,
            total_asset: 0.0,
            total_return: 0.0,
            target_asset: None,
            target_return: None,
        };
        assert!(format_summary(&s).contains("No aggregated assets"));
    }

    #[test]
    fn monthly_table_rows() {
        let rows = vec![MonthlyBalance {
            month_end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            balance_type: BalanceType::Special,
            income: 100_000.0,
            expenditure: 0.0,
            net: 100_000.0,
            target_income: 0.0,
            target_expenditure: 0.0,
            target_net: 80_000.0,
            cumulative_net: Some(100_000.0),
            cumulative_target_net: Some(80_000.0),
        }];
        let text = format_monthly_balance(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("2024-01    special"));
        assert!(lines[2].contains("100,000"));
        assert!(lines[2].ends_with("80,000"));
    }
}
