use tracing::info;

/// Outbound email. Delivery belongs to an external transactional provider.
pub trait Mailer {
    fn send_otp(&self, to: &str, name: &str, otp: &str) -> anyhow::Result<()>;
}

pub fn otp_email_body(name: &str, otp: &str) -> String {
    format!(
        "Hi {},\n\nYour verification code is {}.\nEnter it to finish setting up your account.\n",
        name, otp
    )
}

/// Writes the message to the log instead of sending it.
#[derive(Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_otp(&self, to: &str, name: &str, otp: &str) -> anyhow::Result<()> {
        info!(%to, body = %otp_email_body(name, otp), "otp email");
        Ok(())
    }
}
