pub mod admin;
pub mod fort;
pub mod general;
pub mod kos;
pub mod undermine;
pub mod users;

pub fn commands() -> Vec<poise::Command<crate::bot::Bot, color_eyre::eyre::ErrReport>> {
    vec![
        general::commands::help(),
        general::commands::status(),
        general::commands::time(),
        general::commands::feedback(),
        users::commands::user(),
        fort::commands::drop(),
        fort::commands::fort(),
        fort::commands::pin(),
        undermine::commands::hold(),
        undermine::commands::um(),
        kos::commands::kos(),
        admin::commands::admin(),
    ]
}
