//! Handlers for `taxmate register`, `taxmate login` and `taxmate logout`.

use crate::api::{Api, RegisteredUser, TokenFile};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::{ensure, Context};
use tracing::debug;

/// Exchanges `username` and `password` for an access token and saves it in the secrets directory.
///
/// # Errors
/// - `ErrorType::Request` when the API rejects the credentials.
/// - `ErrorType::Auth` when the API returns no token or the token cannot be saved.
pub async fn login(config: &Config, api: &dyn Api, username: &str, password: &str) -> Result<Out<()>> {
    let response = api
        .login(username.trim(), password)
        .await
        .context("Login failed")
        .pub_result(ErrorType::Request)?;

    let token = response.access_token.trim();
    ensure_token(token).pub_result(ErrorType::Auth)?;

    let path = config.token_path();
    TokenFile::new(token)
        .save(&path)
        .await
        .with_context(|| format!("Unable to save the token to {}", path.display()))
        .pub_result(ErrorType::Auth)?;
    debug!("Saved the access token to {}", path.display());

    Ok(format!("Logged in as {}", username.trim()).into())
}

/// Creates an account. No token is saved; run `taxmate login` afterwards.
pub async fn register(api: &dyn Api, email: &str, password: &str) -> Result<Out<RegisteredUser>> {
    let email = email.trim();
    let user = api
        .register(email, password)
        .await
        .context("Registration failed")
        .pub_result(ErrorType::Request)?;
    let shown = if user.email.is_empty() {
        email
    } else {
        user.email.as_str()
    };
    let message = format!("Registered {shown}. Run `taxmate login` to sign in.");
    Ok(Out::new(message, user))
}

/// Deletes the saved token. Logging out twice is not an error.
pub async fn logout(config: &Config) -> Result<Out<()>> {
    let removed = TokenFile::remove(&config.token_path())
        .await
        .pub_result(ErrorType::Auth)?;
    if removed {
        Ok("Logged out".into())
    } else {
        Ok("You were not logged in".into())
    }
}

fn ensure_token(token: &str) -> Result<()> {
    ensure!(!token.is_empty(), "The server did not return an access token");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthContext, TestApi};
    use crate::error::error_type;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_login_saves_token() {
        let env = TestEnv::new().await;
        let api = TestApi::seeded(AuthContext::anonymous());
        let out = login(env.config(), &api, " me@example.com ", "secret1")
            .await
            .unwrap();
        assert_eq!(out.message(), "Logged in as me@example.com");

        let ctx = AuthContext::load(&env.config().token_path()).await.unwrap();
        assert!(ctx.token().unwrap().starts_with("mock_token_"));
    }

    #[tokio::test]
    async fn test_login_short_password() {
        let env = TestEnv::new().await;
        let api = TestApi::seeded(AuthContext::anonymous());
        let err = login(env.config(), &api, "me@example.com", "123")
            .await
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Request));
        assert!(format!("{err:#}").contains("at least 6 characters"));
        assert!(!env.config().token_path().exists());
    }

    #[tokio::test]
    async fn test_register() {
        let env = TestEnv::anonymous().await;
        let out = register(env.api(), " new@example.com ", "secret1")
            .await
            .unwrap();
        assert_eq!(
            out.message(),
            "Registered new@example.com. Run `taxmate login` to sign in."
        );
        assert_eq!(out.structure().unwrap().email, "new@example.com");
        assert!(!env.config().token_path().exists());
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        let env = TestEnv::anonymous().await;
        register(env.api(), "new@example.com", "secret1")
            .await
            .unwrap();
        let err = register(env.api(), "new@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Request));
        let text = format!("{err:#}");
        assert!(text.starts_with("Registration failed"), "{text}");
        assert!(text.contains("Email already exists"), "{text}");
    }

    #[tokio::test]
    async fn test_logout() {
        let env = TestEnv::new().await;
        let api = TestApi::seeded(AuthContext::anonymous());
        login(env.config(), &api, "me@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(logout(env.config()).await.unwrap().message(), "Logged out");
        assert_eq!(
            logout(env.config()).await.unwrap().message(),
            "You were not logged in"
        );
    }

    #[test]
    fn test_ensure_token() {
        assert!(ensure_token("").is_err());
        assert!(ensure_token("abc").is_ok());
    }
}
