use anyhow::Result;
use serenity::{
    all::{Context, Message},
    builder::{CreateEmbed, CreateMessage},
};
use tracing::info;

use crate::{
    audio::player::PlaybackManager,
    bot::{intake::SubmitOutcome, OpenMusicBot},
    ui::embeds,
};

/// Prefix commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Play(&'a str),
    Pause,
    Resume,
    Skip,
    Stop,
    NowPlaying,
}

/// Parses `<prefix><name> [args]`. Unknown commands yield `None`.
pub fn parse<'a>(prefix: &str, content: &'a str) -> Option<Command<'a>> {
    let rest = content.trim().strip_prefix(prefix)?;
    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, args)| (name, args.trim()));

    match name.to_lowercase().as_str() {
        "play" | "p" if !args.is_empty() => Some(Command::Play(args)),
        "pause" => Some(Command::Pause),
        "resume" => Some(Command::Resume),
        "skip" | "s" => Some(Command::Skip),
        "stop" | "leave" => Some(Command::Stop),
        "np" | "nowplaying" => Some(Command::NowPlaying),
        _ => None,
    }
}

/// Ejecuta un comando recibido por mensaje
pub async fn handle_command(ctx: &Context, msg: &Message, command: Command<'_>, bot: &OpenMusicBot) -> Result<()> {
    let guild_id = msg
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando fuera de un servidor"))?;
    let player = bot.players.get_or_create(guild_id);

    let embed = match command {
        Command::Play(query) => {
            let voice = msg
                .guild(&ctx.cache)
                .and_then(|guild| guild.voice_states.get(&msg.author.id).and_then(|state| state.channel_id));
            let Some(voice) = voice else {
                return reply(ctx, msg, embeds::create_error_embed("Sin canal de voz", "Debes estar en un canal de voz")).await;
            };
            player.set_channels(Some(voice), Some(msg.channel_id));

            match bot.intake.submit(player.as_ref(), msg.author.id, query).await {
                SubmitOutcome::Queued { added, label, provider } => embeds::create_queued_embed(added, &label, provider),
                SubmitOutcome::NoMatches => {
                    embeds::create_warning_embed("Sin resultados", &format!("No se encontró nada para `{}`", query))
                }
                SubmitOutcome::Failed(reason) => embeds::create_error_embed("No se pudo reproducir", &reason),
            }
        }
        Command::Pause => {
            player.set_paused(true);
            embeds::create_warning_embed("Pausado", "La reproducción está en pausa")
        }
        Command::Resume => {
            player.set_paused(false);
            embeds::create_warning_embed("Reanudado", "La reproducción continúa")
        }
        Command::Skip => match player.skip() {
            Some(_) => match player.playing_track() {
                Some(now) => embeds::create_now_playing_embed(&now),
                None => embeds::create_warning_embed("Cola vacía", "No hay más canciones"),
            },
            None => embeds::create_warning_embed("Cola vacía", "No hay más canciones"),
        },
        Command::Stop => {
            player.stop();
            bot.players.remove(guild_id);
            embeds::create_warning_embed("Detenido", "Se limpió la cola")
        }
        Command::NowPlaying => match player.playing_track() {
            Some(now) => embeds::create_now_playing_embed(&now),
            None => embeds::create_warning_embed("Nada sonando", "La cola está vacía"),
        },
    };

    info!("📨 Comando procesado en guild {}", guild_id);
    reply(ctx, msg, embed).await
}

async fn reply(ctx: &Context, msg: &Message, embed: CreateEmbed) -> Result<()> {
    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_keeps_query() {
        assert_eq!(
            parse("!", "!play  never gonna give you up "),
            Some(Command::Play("never gonna give you up"))
        );
        assert_eq!(parse("!", "!P scsearch:lofi"), Some(Command::Play("scsearch:lofi")));
    }

    #[test]
    fn test_parse_rejects_other_messages() {
        assert_eq!(parse("!", "play something"), None);
        assert_eq!(parse("!", "!play"), None);
        assert_eq!(parse("!", "!dance"), None);
        assert_eq!(parse("?", "?np"), Some(Command::NowPlaying));
        assert_eq!(parse("!", "!leave"), Some(Command::Stop));
    }
}
