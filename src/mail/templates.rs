use askama::Template;

#[derive(Template)]
#[template(path = "password_reset.html")]
pub struct PasswordResetEmail<'a> {
    pub user_name: &'a str,
    pub reset_link: &'a str,
}

impl PasswordResetEmail<'_> {
    pub const SUBJECT: &'static str = "Password reset request";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_link_and_name() {
        let html = PasswordResetEmail {
            user_name: "Ada",
            reset_link: "http://frontend.test/api/users/reset-password/abc123",
        }
        .render()
        .unwrap();
        assert!(html.contains("Ada"));
        assert!(html.contains("http://frontend.test/api/users/reset-password/abc123"));
    }

    #[test]
    fn escapes_user_name() {
        let html = PasswordResetEmail {
            user_name: "<script>",
            reset_link: "http://x",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
    }
}
