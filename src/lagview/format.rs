use super::types::LagView;

const HEADERS: [&str; 3] = ["Rep_dt", "Delta", "DeltaLag"];

/// Render a lag view as a plain-text table. Missing lags print as `NaN`,
/// matching how the original data-frame output showed them.
pub fn render_table(view: &LagView) -> String {
    let body: Vec<[String; 3]> = view
        .rows
        .iter()
        .map(|row| {
            [
                row.report_date.format("%Y-%m-%d").to_string(),
                format_value(row.delta),
                row.delta_lag.map(format_value).unwrap_or_else(|| "NaN".to_string()),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:<w0$}  {:>w1$}  {:>w2$}\n",
        HEADERS[0],
        HEADERS[1],
        HEADERS[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    ));
    for [date, delta, lag] in &body {
        out.push_str(&format!(
            "{:<w0$}  {:>w1$}  {:>w2$}\n",
            date,
            delta,
            lag,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        ));
    }
    out
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}
