//! Mail delivery
//!
//! Wraps the system sendmail binary: the message is written to its
//! stdin with `-t` so recipients come from the headers. Delivery
//! failures are reported as errors and handled (logged, never fatal)
//! by the run driver.

use crate::error::{Error, Result};
use crate::manifest::MailConfig;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Delivery seam between the run driver and the mail system
pub trait Notifier {
    /// Deliver a rendered document to the given recipients
    ///
    /// An empty recipient list is a silent no-op.
    fn send(&self, subject: &str, html_body: &str, recipients: &[String]) -> Result<()>;
}

/// Notifier shelling out to sendmail
pub struct SendmailNotifier {
    from: String,
    sendmail: PathBuf,
}

impl SendmailNotifier {
    pub fn from_config(mail: &MailConfig) -> Self {
        Self {
            from: mail.from.clone(),
            sendmail: mail.sendmail.clone(),
        }
    }
}

impl Notifier for SendmailNotifier {
    fn send(&self, subject: &str, html_body: &str, recipients: &[String]) -> Result<()> {
        if recipients.is_empty() {
            return Ok(());
        }

        let message = build_message(&self.from, recipients, subject, html_body);

        let mut child = Command::new(&self.sendmail)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Notify {
                subject: subject.to_string(),
                reason: format!("failed to spawn {}: {}", self.sendmail.display(), e),
            })?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(message.as_bytes())
                .map_err(|e| Error::Notify {
                    subject: subject.to_string(),
                    reason: format!("failed to write message: {}", e),
                })?;
        }

        let output = child.wait_with_output().map_err(|e| Error::Notify {
            subject: subject.to_string(),
            reason: format!("sendmail did not exit: {}", e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Notify {
                subject: subject.to_string(),
                reason: format!(
                    "sendmail exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        Ok(())
    }
}

/// Assemble the RFC 822 message handed to sendmail
fn build_message(from: &str, recipients: &[String], subject: &str, html_body: &str) -> String {
    format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}",
        from,
        recipients.join(", "),
        subject,
        html_body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_headers() {
        let msg = build_message(
            "fleetwatch@example.org",
            &["a@x".to_string(), "b@x".to_string()],
            "[ALERT] Node down [G]",
            "<p>body</p>",
        );

        assert!(msg.starts_with("From: fleetwatch@example.org\r\n"));
        assert!(msg.contains("To: a@x, b@x\r\n"));
        assert!(msg.contains("Subject: [ALERT] Node down [G]\r\n"));
        assert!(msg.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(msg.ends_with("\r\n\r\n<p>body</p>"));
    }

    #[test]
    fn test_empty_recipients_is_noop() {
        let notifier = SendmailNotifier {
            from: "x@y".to_string(),
            sendmail: PathBuf::from("/nonexistent/sendmail"),
        };
        // Would fail to spawn if it tried to send.
        notifier.send("subject", "<p></p>", &[]).unwrap();
    }
}
