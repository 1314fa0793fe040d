/// Email template trait
pub trait EmailTemplate {
    fn subject(&self) -> String;

    fn html_body(&self) -> String;

    fn text_body(&self) -> String;
}

/// Sent to the admin when an organizer registers.
pub struct ApprovalRequestEmailTemplate {
    pub organizer_name: String,
    pub organizer_email: String,
    /// Signed link; following it approves the organizer.
    pub approval_link: String,
}

impl EmailTemplate for ApprovalRequestEmailTemplate {
    fn subject(&self) -> String {
        format!("New organizer registration: {}", self.organizer_name)
    }

    fn html_body(&self) -> String {
        let link = escape_html(&self.approval_link);
        format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <p>A new organizer has registered and is waiting for approval.</p>
    <ul>
        <li>Name: {}</li>
        <li>Email: {}</li>
    </ul>
    <p><a href="{}">Approve organizer</a></p>
    <p style="color: #666; font-size: 14px;">Anyone holding this link can approve the account. Do not forward it.</p>
</body>
</html>"#,
            escape_html(&self.organizer_name),
            escape_html(&self.organizer_email),
            link
        )
    }

    fn text_body(&self) -> String {
        format!(
            r#"A new organizer has registered and is waiting for approval.

Name: {}
Email: {}

Approve: {}

Anyone holding this link can approve the account. Do not forward it.
"#,
            self.organizer_name, self.organizer_email, self.approval_link
        )
    }
}

/// Sent to an organizer once their account is approved.
pub struct OrganizerApprovedEmailTemplate {
    pub organizer_name: String,
}

impl EmailTemplate for OrganizerApprovedEmailTemplate {
    fn subject(&self) -> String {
        "Your organizer account has been approved".to_string()
    }

    fn html_body(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <p>Hello {},</p>
    <p>Your organizer account has been approved. You can now log in and publish events.</p>
</body>
</html>"#,
            escape_html(&self.organizer_name)
        )
    }

    fn text_body(&self) -> String {
        format!(
            "Hello {},\n\nYour organizer account has been approved. \
             You can now log in and publish events.\n",
            self.organizer_name
        )
    }
}

/// Names are user input; everything interpolated into HTML goes through here.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
