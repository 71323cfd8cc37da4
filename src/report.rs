//! HTML report rendering
//!
//! Produces the self-contained HTML document attached to every
//! notification: a health banner, a totals strip and one table per
//! group with role badges and per-probe verdicts.

use crate::transition::GroupSlice;
use chrono::Local;

/// Structured input for the renderer
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    /// Groups in presentation order
    pub groups: Vec<(String, GroupSlice)>,
    /// Overall issue count shown in the banner
    pub issues: usize,
}

impl ReportData {
    pub fn single(group: &str, slice: GroupSlice) -> Self {
        let issues = slice.issues;
        Self {
            groups: vec![(group.to_string(), slice)],
            issues,
        }
    }
}

/// Badge label and color per node role
fn role_badge(role: &str) -> (&'static str, &'static str) {
    match role {
        "login" => ("LOGIN", "#0288d1"),
        "compute" => ("COMPUTE", "#6a1b9a"),
        "gpu" => ("GPU", "#f9a825"),
        "storage" => ("STORAGE", "#2e7d32"),
        _ => ("NODE", "#546e7a"),
    }
}

const OK_COLOR: &str = "#1e8e3e";
const CRITICAL_COLOR: &str = "#d93025";

/// Render the report document
pub fn render(data: &ReportData) -> String {
    let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
    let healthy = data.issues == 0;
    let total_nodes: usize = data.groups.iter().map(|(_, d)| d.rows.len()).sum();

    let banner = if healthy {
        "ALL SYSTEMS HEALTHY".to_string()
    } else {
        format!("{} ACTIVE ISSUE(S)", data.issues)
    };
    let (banner_bg, banner_border) = if healthy {
        ("#e6f4ea", OK_COLOR)
    } else {
        ("#fdecea", CRITICAL_COLOR)
    };

    let mut html = format!(
        r#"<style>
body {{ font-family: Segoe UI, Arial, sans-serif; background: #ffffff; color: #222; }}
table {{ width: 100%; border-collapse: separate; border-spacing: 0 10px; font-size: 14px; }}
th {{ background: #eceff1; padding: 10px; text-align: left; }}
td {{ padding: 10px; background: #ffffff; }}
</style>
<div style="max-width:1150px;margin:auto;">
<div style="padding:22px;border-radius:14px;background:{banner_bg};border:2px solid {banner_border};">
<h1 style="margin:0;">Fleet Monitoring Report</h1>
<p>Generated: <b>{ts}</b></p>
<span style="padding:6px 18px;border-radius:20px;background:{banner_border};color:white;font-weight:600;">{banner}</span>
</div>
<div style="margin-top:18px;padding:16px;background:#f7f9fc;border-radius:12px;border:1px solid #d0d7de;">
<b>Total Nodes:</b> {total_nodes} &nbsp;&nbsp; <b>Issues:</b> {issues}
</div>
"#,
        issues = data.issues,
    );

    for (group, slice) in &data.groups {
        html.push_str(&format!(
            r#"<div style="margin-top:26px;">
<div style="padding:14px;border-radius:12px;background:#f5f7fa;border-left:6px solid #90a4ae;font-size:18px;font-weight:700;">
{} &mdash; {} issue(s)
</div>
<table>
<thead><tr>
<th>Node</th><th>Role</th><th>Address</th><th>Status</th><th>Ping</th><th>SSH</th><th>Last Seen</th><th>Uptime</th><th>Node State</th>
</tr></thead>
<tbody>
"#,
            escape(group),
            slice.issues,
        ));

        for row in &slice.rows {
            let (severity, color) = if row.is_issue {
                ("CRITICAL", CRITICAL_COLOR)
            } else {
                ("OK", OK_COLOR)
            };
            let (role_text, role_color) = role_badge(&row.role);
            let node_state = if row.is_issue { "DOWN" } else { "UP" };

            html.push_str(&format!(
                r#"<tr style="border-left:6px solid {color};">
<td><b>{name}</b></td>
<td><span style="padding:4px 10px;border-radius:12px;background:{role_color};color:white;font-size:12px;font-weight:600;">{role_text}</span></td>
<td>{address}</td>
<td style="color:{color};font-weight:700;">{severity}</td>
<td>{ping}</td>
<td>{ssh}</td>
<td>{last_seen}</td>
<td>{uptime}</td>
<td style="color:{color};font-weight:700;">{node_state}</td>
</tr>
"#,
                name = escape(&row.name),
                address = escape(&row.address),
                ping = verdict_cell(row.ping.ok, &row.ping.detail),
                ssh = verdict_cell(row.login.ok, &row.login.detail),
                last_seen = escape(&row.last_seen),
                uptime = escape(&row.uptime),
            ));
        }

        html.push_str("</tbody></table></div>\n");
    }

    html.push_str(
        r#"<div style="margin-top:30px;padding:14px;font-size:12px;color:#555;">
Automated report generated by <b>fleetwatch</b>.
</div>
</div>
"#,
    );

    html
}

fn verdict_cell(ok: bool, detail: &str) -> String {
    if ok {
        format!(r#"<span style="color:{};">OK</span>"#, OK_COLOR)
    } else {
        format!(
            r#"<span style="color:{};">FAIL ({})</span>"#,
            CRITICAL_COLOR,
            escape(detail)
        )
    }
}

/// Minimal HTML escaping for untrusted field values
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patrol::NodeObservation;

    fn slice_of(rows: Vec<NodeObservation>) -> GroupSlice {
        let mut slice = GroupSlice::default();
        for row in rows {
            slice.push(row);
        }
        slice
    }

    #[test]
    fn test_healthy_report_banner() {
        let data = ReportData::single("Cluster", slice_of(vec![NodeObservation::healthy("n1")]));
        let html = render(&data);
        assert!(html.contains("ALL SYSTEMS HEALTHY"));
        assert!(html.contains("Cluster"));
        assert!(html.contains("n1"));
        assert!(html.contains("Total Nodes:</b> 1"));
    }

    #[test]
    fn test_issue_report_banner_and_severity() {
        let data = ReportData::single("Cluster", slice_of(vec![NodeObservation::down("n1")]));
        let html = render(&data);
        assert!(html.contains("1 ACTIVE ISSUE(S)"));
        assert!(html.contains("CRITICAL"));
        assert!(html.contains("FAIL (no reply)"));
        assert!(html.contains(">DOWN</td>"));
    }

    #[test]
    fn test_node_state_column_rendered() {
        let data = ReportData::single("G", slice_of(vec![NodeObservation::healthy("n1")]));
        let html = render(&data);
        assert!(html.contains("<th>Node State</th>"));
        assert!(html.contains(">UP</td>"));
    }

    #[test]
    fn test_multiple_groups_render_in_order() {
        let data = ReportData {
            groups: vec![
                ("Alpha".to_string(), slice_of(vec![NodeObservation::healthy("a1")])),
                ("Beta".to_string(), slice_of(vec![NodeObservation::down("b1")])),
            ],
            issues: 1,
        };
        let html = render(&data);
        let alpha = html.find("Alpha").unwrap();
        let beta = html.find("Beta").unwrap();
        assert!(alpha < beta);
    }

    #[test]
    fn test_node_fields_are_escaped() {
        let mut row = NodeObservation::healthy("n1");
        row.name = "<script>alert(1)</script>".to_string();
        let data = ReportData::single("G", slice_of(vec![row]));
        let html = render(&data);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_role_badges() {
        assert_eq!(role_badge("gpu").0, "GPU");
        assert_eq!(role_badge("login").0, "LOGIN");
        assert_eq!(role_badge("anything-else").0, "NODE");
    }
}
