//! Email subjects and bodies
//!
//! Each function returns `(subject, html)` for the mailer.

/// Welcome mail sent after a successful registration
pub fn welcome(username: &str) -> (String, String) {
    let subject = "Welcome to Chirp!".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #1d9bf0; color: white; padding: 20px; text-align: center;">
    <h1 style="margin: 0;">Chirp</h1>
  </div>
  <div style="padding: 30px; background-color: #f8f9fa;">
    <h2 style="color: #333;">Welcome aboard!</h2>
    <p style="color: #666; line-height: 1.6;">Hello <strong>{username}</strong>,</p>
    <p style="color: #666; line-height: 1.6;">
      Your account has been created. You can now post, follow other people,
      and build your timeline.
    </p>
    <p style="color: #666; line-height: 1.6;">The Chirp Team</p>
  </div>
  <div style="background-color: #333; color: white; padding: 15px; text-align: center; font-size: 12px;">
    <p style="margin: 0;">This is an automated email. Please do not reply.</p>
  </div>
</div>"#
    );
    (subject, html)
}

/// Password-reset mail carrying the one-time code
pub fn password_reset_otp(username: &str, code: &str) -> (String, String) {
    let subject = "Password Reset Code - Chirp".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #1d9bf0; color: white; padding: 20px; text-align: center;">
    <h1 style="margin: 0;">Chirp</h1>
  </div>
  <div style="padding: 30px; background-color: #f8f9fa;">
    <h2 style="color: #333;">Password Reset Request</h2>
    <p style="color: #666; line-height: 1.6;">Hello <strong>{username}</strong>,</p>
    <p style="color: #666; line-height: 1.6;">
      We received a request to reset your password. Use the following code to
      complete the process:
    </p>
    <div style="background-color: #fff; border: 2px solid #1d9bf0; border-radius: 8px; padding: 20px; text-align: center; margin: 30px 0;">
      <h1 style="color: #1d9bf0; font-size: 32px; letter-spacing: 8px; margin: 0; font-family: monospace;">{code}</h1>
    </div>
    <p style="color: #666; line-height: 1.6;">
      The code is valid for 10 minutes. If you didn't request this, you can
      ignore this email.
    </p>
  </div>
  <div style="background-color: #333; color: white; padding: 15px; text-align: center; font-size: 12px;">
    <p style="margin: 0;">This is an automated email. Please do not reply.</p>
  </div>
</div>"#
    );
    (subject, html)
}

/// Confirmation mail sent after the password changed
pub fn password_changed(username: &str) -> (String, String) {
    let subject = "Password Changed - Chirp".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #1d9bf0; color: white; padding: 20px; text-align: center;">
    <h1 style="margin: 0;">Chirp</h1>
  </div>
  <div style="padding: 30px; background-color: #f8f9fa;">
    <h2 style="color: #333;">Password Successfully Changed</h2>
    <p style="color: #666; line-height: 1.6;">Hello <strong>{username}</strong>,</p>
    <p style="color: #666; line-height: 1.6;">
      Your password was just changed and every signed-in session has been
      logged out. If you made this change, no action is needed.
    </p>
    <p style="color: #666; line-height: 1.6;">
      If you did not change your password, contact support immediately.
    </p>
  </div>
  <div style="background-color: #333; color: white; padding: 15px; text-align: center; font-size: 12px;">
    <p style="margin: 0;">This is an automated email. Please do not reply.</p>
  </div>
</div>"#
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_template_includes_code_and_name() {
        let (subject, html) = password_reset_otp("alice", "123456");
        assert!(subject.contains("Password Reset"));
        assert!(html.contains("123456"));
        assert!(html.contains("alice"));
    }

    #[test]
    fn test_welcome_template_includes_name() {
        let (_, html) = welcome("alice");
        assert!(html.contains("alice"));
    }

    #[test]
    fn test_password_changed_template_includes_name() {
        let (subject, html) = password_changed("alice");
        assert!(subject.contains("Password Changed"));
        assert!(html.contains("alice"));
    }
}
