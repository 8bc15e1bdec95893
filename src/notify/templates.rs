//! HTML bodies for outgoing email.

use crate::models::Grade;

fn grade_color(grade: Grade) -> &'static str {
    match grade {
        Grade::A => "#00ff88",
        Grade::B => "#00cc33",
        Grade::C => "#ffd600",
        Grade::D => "#ff9800",
        Grade::F => "#ff4444",
    }
}

/// Minimal escaping for text interpolated into HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Subject and body of the email carrying a report link.
pub fn report_email(hostname: &str, score: u8, grade: Grade, report_url: &str) -> (String, String) {
    let host = escape_html(hostname);
    let link = escape_html(report_url);
    let color = grade_color(grade);
    let subject = format!("Your Security Report for {hostname}: Grade {grade}");
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="margin:0;padding:0;background:#0a0a0a;font-family:'Segoe UI',system-ui,sans-serif;">
<div style="max-width:600px;margin:0 auto;padding:40px 24px;">
  <div style="font-size:28px;font-weight:700;color:#fff;text-align:center;">Web<span style="color:#00FF41;">Sec</span>Check</div>
  <div style="background:#111;border:1px solid #2a2a2a;border-radius:12px;padding:32px;margin-top:24px;">
    <h2 style="color:#fff;margin:0 0 8px;">Your Security Report is Ready</h2>
    <p style="color:#aaa;">We scanned <strong style="color:#fff;">{host}</strong>.</p>
    <p style="font-size:36px;font-weight:800;color:{color};margin:16px 0;">{score} ({grade})</p>
    <a href="{link}" style="display:inline-block;background:#00FF41;color:#000;padding:14px 40px;border-radius:10px;font-weight:700;text-decoration:none;">View Full Report</a>
    <p style="color:#666;font-size:12px;margin-top:16px;">This link is unique to you and stays valid for 30 days.</p>
  </div>
</div>
</body>
</html>"#
    );
    (subject, html)
}

/// Subject and body of the operator alert sent after each scan.
pub fn scan_alert(
    hostname: &str,
    score: u8,
    grade: Grade,
    ip_address: Option<&str>,
) -> (String, String) {
    let host = escape_html(hostname);
    let color = grade_color(grade);
    let ip_line = ip_address
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            format!(
                r#"<p style="color:#666;font-size:12px;margin:0;">IP: {}</p>"#,
                escape_html(ip)
            )
        })
        .unwrap_or_default();
    let subject = format!("New scan: {hostname} {score}/100 ({grade})");
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="margin:0;padding:0;background:#0a0a0a;font-family:'Segoe UI',system-ui,sans-serif;">
<div style="max-width:500px;margin:0 auto;padding:30px 20px;">
  <div style="font-size:11px;color:#888;letter-spacing:2px;">NEW SCAN ALERT</div>
  <div style="background:#111;border:1px solid #2a2a2a;border-radius:12px;padding:24px;margin-top:12px;">
    <div style="font-size:14px;font-weight:600;color:#fff;">{host}</div>
    <div style="font-size:24px;font-weight:800;color:{color};">{score} ({grade})</div>
    {ip_line}
  </div>
</div>
</body>
</html>"#
    );
    (subject, html)
}
