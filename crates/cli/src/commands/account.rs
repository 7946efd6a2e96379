//! Account commands: signup, login, logout, whoami.

use bookstore_client::{ClientError, LoginInput, SignupInput};
use secrecy::SecretString;

use super::Context;

/// Create an account. The user still has to log in afterwards.
///
/// # Errors
///
/// Returns `ClientError` if validation fails or the API rejects the signup.
pub async fn signup(
    ctx: &Context,
    full_name: String,
    email: String,
    password: SecretString,
) -> Result<(), ClientError> {
    let input = SignupInput {
        full_name,
        email,
        confirm_password: password.clone(),
        password,
    };
    let profile = ctx.session.signup(&input).await?;
    println!("Account created for {} <{}>", profile.full_name, profile.email);
    println!("Run `bookstore login -e {}` to sign in.", profile.email);
    Ok(())
}

/// Log in and persist the session.
///
/// # Errors
///
/// Returns `ClientError` if the credentials are rejected.
pub async fn login(
    ctx: &Context,
    email: String,
    password: SecretString,
) -> Result<(), ClientError> {
    let route = ctx.session.login(&LoginInput::new(email, password)).await?;
    if let Some(user) = ctx.session.user() {
        println!("Signed in as {} ({})", user.full_name, user.role);
    }
    println!("Landing page: {route}");
    Ok(())
}

/// Log out and forget the local session.
pub async fn logout(ctx: &Context) {
    let route = ctx.session.logout().await;
    println!("Signed out. Landing page: {route}");
}

/// Show the signed-in user as the API sees them.
///
/// # Errors
///
/// Returns `ClientError` if there is no valid session.
pub async fn whoami(ctx: &Context) -> Result<(), ClientError> {
    let user = ctx.session.users().me().await?;
    println!("{} <{}>", user.full_name, user.email);
    println!("Role: {}", user.role);
    println!("Id:   {}", user.id);
    Ok(())
}
