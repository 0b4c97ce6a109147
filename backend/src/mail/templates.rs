//! HTML email templates.

use chrono::{DateTime, FixedOffset, Utc};

/// Which message to render, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailKind {
    /// Signup verification code.
    Otp { code: String, ttl_minutes: i64 },
    /// Sent once, on the first login after verification.
    AccountCreated { name: String },
    /// Sent on every login.
    LoginSuccessful { name: String, local_time: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn render(product: &str, kind: &EmailKind) -> RenderedEmail {
    let product_html = escape_html(product);
    match kind {
        EmailKind::Otp { code, ttl_minutes } => RenderedEmail {
            subject: format!("{} – Your OTP", product),
            html: layout(
                &product_html,
                &format!(
                    "<p>Your verification code is:</p>\
                     <p style=\"font-size:28px;font-weight:bold;letter-spacing:6px\">{}</p>\
                     <p>This code is valid for {} minutes. Do not share it with anyone.</p>",
                    escape_html(code),
                    ttl_minutes
                ),
            ),
        },
        EmailKind::AccountCreated { name } => RenderedEmail {
            subject: format!("{} – Account Created", product),
            html: layout(
                &product_html,
                &format!(
                    "<p>Hi {},</p>\
                     <p>Your {} account has been created and verified. Welcome aboard!</p>",
                    escape_html(name),
                    product_html
                ),
            ),
        },
        EmailKind::LoginSuccessful { name, local_time } => RenderedEmail {
            subject: format!("{} – Login Successful", product),
            html: layout(
                &product_html,
                &format!(
                    "<p>Hi {},</p>\
                     <p>You signed in to {} on {}.</p>\
                     <p>If this wasn't you, reset your password immediately.</p>",
                    escape_html(name),
                    product_html,
                    escape_html(local_time)
                ),
            ),
        },
    }
}

/// Human-readable timestamp in the display timezone,
/// e.g. `17 Oct 2026, 03:04 PM IST`.
pub fn format_local_time(at: DateTime<Utc>, offset: FixedOffset, zone_label: &str) -> String {
    let local = at.with_timezone(&offset);
    format!("{} {}", local.format("%d %b %Y, %I:%M %p"), zone_label)
}

fn layout(product_html: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html><body style=\"font-family:Arial,sans-serif;color:#222\">\
         <h2>{}</h2>{}\
         <p style=\"color:#888;font-size:12px\">This is an automated message from {}.</p>\
         </body></html>",
        product_html, content, product_html
    )
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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
    use chrono::TimeZone;

    #[test]
    fn test_otp_email() {
        let email = render(
            "ExamPrep",
            &EmailKind::Otp {
                code: "012345".to_string(),
                ttl_minutes: 15,
            },
        );
        assert_eq!(email.subject, "ExamPrep – Your OTP");
        assert!(email.html.contains("012345"));
        assert!(email.html.contains("valid for 15 minutes"));
    }

    #[test]
    fn test_account_created_greets_by_name() {
        let email = render(
            "ExamPrep",
            &EmailKind::AccountCreated {
                name: "Asha".to_string(),
            },
        );
        assert_eq!(email.subject, "ExamPrep – Account Created");
        assert!(email.html.contains("Hi Asha,"));
    }

    #[test]
    fn test_login_email_has_time() {
        let email = render(
            "ExamPrep",
            &EmailKind::LoginSuccessful {
                name: "Asha".to_string(),
                local_time: "17 Oct 2026, 03:04 PM IST".to_string(),
            },
        );
        assert_eq!(email.subject, "ExamPrep – Login Successful");
        assert!(email.html.contains("17 Oct 2026, 03:04 PM IST"));
    }

    #[test]
    fn test_names_are_escaped() {
        let email = render(
            "ExamPrep",
            &EmailKind::AccountCreated {
                name: "<script>alert(1)</script>".to_string(),
            },
        );
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_format_local_time_applies_offset() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 34, 0).unwrap();
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        assert_eq!(format_local_time(at, ist, "IST"), "17 Oct 2026, 03:04 PM IST");
    }
}
