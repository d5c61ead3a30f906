//! Session commands.

use shopfront_client::Storefront;
use shopfront_client::backend::types::ProfileUpdate;
use shopfront_client::session::RegistrationForm;
use shopfront_core::Email;

use super::{CommandResult, login_required};
use crate::render;

pub async fn login(storefront: &Storefront, username: &str, password: &str) -> CommandResult {
    let user = storefront.session().login(username, password).await?;
    println!("Logged in as {}", user.username);
    Ok(())
}

pub async fn register(storefront: &Storefront, form: RegistrationForm) -> CommandResult {
    let user = storefront.session().register(form).await?;
    println!("Registered and logged in as {}", user.username);
    Ok(())
}

pub async fn logout(storefront: &Storefront) {
    storefront.session().logout().await;
    println!("Logged out");
}

pub async fn whoami(storefront: &Storefront) -> CommandResult {
    let user = storefront
        .session()
        .current_user()
        .await
        .ok_or_else(login_required)?;
    render::user(&user);
    Ok(())
}

pub async fn update_profile(
    storefront: &Storefront,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
) -> CommandResult {
    if storefront.session().current_user().await.is_none() {
        return Err(login_required());
    }
    let update = ProfileUpdate {
        email: email.as_deref().map(Email::parse).transpose()?,
        first_name,
        last_name,
    };
    let user = storefront.session().update_profile(&update).await?;
    render::user(&user);
    Ok(())
}
