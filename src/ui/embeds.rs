use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{audio::player::NowPlaying, sources::ProviderId};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Open Music Bot";

/// Crea un embed para mostrar la canción actual
pub fn create_now_playing_embed(now: &NowPlaying) -> CreateEmbed {
    let info = now.item.track.info();
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", info.title))
        .color(colors::SUCCESS_GREEN)
        .field("🎤 Artista", &info.author, true);

    embed = match now.item.track.duration() {
        Some(duration) => embed.field(
            "⏱️ Posición",
            format!(
                "{} / {}",
                format_duration(Duration::from_millis(now.position_ms)),
                format_duration(duration)
            ),
            true,
        ),
        None => embed.field("⏱️ Duración", "🔴 En vivo", true),
    };

    embed = embed
        .field("👤 Solicitado por", format!("<@{}>", now.item.requested_by), true)
        .field("🔗 Fuente", &info.source, true);

    if let Some(uri) = &info.uri {
        embed = embed.url(uri);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar lo que se agregó a la cola
pub fn create_queued_embed(added: usize, label: &str, provider: ProviderId) -> CreateEmbed {
    let (title, color) = if added == 1 {
        ("✅ Canción Agregada Exitosamente", colors::SUCCESS_GREEN)
    } else {
        ("📋 Playlist Agregada Exitosamente", colors::MUSIC_PURPLE)
    };

    CreateEmbed::default()
        .title(title)
        .description(format!("**{}** se ha agregado a la cola de reproducción", label))
        .color(color)
        .field("📊 Canciones agregadas", added.to_string(), true)
        .field("🔗 Fuente", provider.as_str(), true)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new("🎵 Se reproducirá automáticamente si no hay música sonando"))
}

/// Crea un embed de aviso
pub fn create_warning_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("⚠️ {}", title))
        .description(description)
        .color(colors::WARNING_ORANGE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(213)), "3:33");
        assert_eq!(format_duration(Duration::from_secs(3_723)), "1:02:03");
        assert_eq!(format_duration(Duration::ZERO), "0:00");
    }
}
