// Wire protocol DTOs and conversions for public WebSocket messages.
// Admin HTTP request bodies live with their handlers in `net::admin`.

use crate::domain::state::{EnemySnapshot, HazardSnapshot, ItemSnapshot, PlayerSnapshot};
use crate::domain::{CommunicationMode, EnemyKind, InputCommand, ItemKind, Rect, Snapshot};
use crate::use_cases::ListenerRole;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Sent once after Join or Spectate is accepted.
    Identity { session_id: u64, role: RoleDto },
    // Full session state for one tick.
    Snapshot(SnapshotDto),
    // Request rejected; the connection stays open unless stated otherwise.
    Error { message: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Creates a new session owned by this connection.
    Join(JoinPayload),
    // Attaches read-only to an existing session.
    Spectate(SpectatePayload),
    Input(InputPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpectatePayload {
    pub session_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputPayload {
    pub command: InputCommandDto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputCommandDto {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Stop,
}

impl From<InputCommandDto> for InputCommand {
    fn from(command: InputCommandDto) -> Self {
        match command {
            InputCommandDto::Left => InputCommand::Left,
            InputCommandDto::Right => InputCommand::Right,
            InputCommandDto::Up => InputCommand::Up,
            InputCommandDto::Down => InputCommand::Down,
            InputCommandDto::Jump => InputCommand::Jump,
            InputCommandDto::Stop => InputCommand::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleDto {
    Player,
    Spectator,
}

impl From<ListenerRole> for RoleDto {
    fn from(role: ListenerRole) -> Self {
        match role {
            ListenerRole::Player => RoleDto::Player,
            ListenerRole::Spectator => RoleDto::Spectator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModeDto {
    Text,
    Json,
}

impl From<ModeDto> for CommunicationMode {
    fn from(mode: ModeDto) -> Self {
        match mode {
            ModeDto::Text => CommunicationMode::Text,
            ModeDto::Json => CommunicationMode::Json,
        }
    }
}

impl From<CommunicationMode> for ModeDto {
    fn from(mode: CommunicationMode) -> Self {
        match mode {
            CommunicationMode::Text => ModeDto::Text,
            CommunicationMode::Json => ModeDto::Json,
        }
    }
}

/// Enemy kinds by their display colour; behaviour names and the console colour words are aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKindDto {
    #[serde(rename = "RED", alias = "PATROLLER", alias = "ROJO")]
    Red,
    #[serde(rename = "BLUE", alias = "FALLER", alias = "AZUL")]
    Blue,
}

impl From<EnemyKindDto> for EnemyKind {
    fn from(kind: EnemyKindDto) -> Self {
        match kind {
            EnemyKindDto::Red => EnemyKind::Patroller,
            EnemyKindDto::Blue => EnemyKind::Faller,
        }
    }
}

impl From<EnemyKind> for EnemyKindDto {
    fn from(kind: EnemyKind) -> Self {
        match kind {
            EnemyKind::Patroller => EnemyKindDto::Red,
            EnemyKind::Faller => EnemyKindDto::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemKindDto {
    Banana,
    #[serde(alias = "NARANJA")]
    Orange,
    #[serde(alias = "CEREZA")]
    Cherry,
}

impl From<ItemKindDto> for ItemKind {
    fn from(kind: ItemKindDto) -> Self {
        match kind {
            ItemKindDto::Banana => ItemKind::Banana,
            ItemKindDto::Orange => ItemKind::Orange,
            ItemKindDto::Cherry => ItemKind::Cherry,
        }
    }
}

impl From<ItemKind> for ItemKindDto {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Banana => ItemKindDto::Banana,
            ItemKind::Orange => ItemKindDto::Orange,
            ItemKind::Cherry => ItemKindDto::Cherry,
        }
    }
}

/// Snapshot of a session sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDto {
    pub tick: u64,
    pub level: u32,
    pub won: bool,
    pub speed_multiplier: f32,
    pub player: PlayerDto,
    pub enemies: Vec<EnemyDto>,
    pub items: Vec<ItemDto>,
    pub hazard: HazardDto,
    pub cage: RectDto,
}

impl From<&Snapshot> for SnapshotDto {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            tick: snapshot.tick,
            level: snapshot.level,
            won: snapshot.won,
            speed_multiplier: snapshot.speed_multiplier,
            player: PlayerDto::from(&snapshot.player),
            enemies: snapshot.enemies.iter().map(EnemyDto::from).collect(),
            items: snapshot.items.iter().map(ItemDto::from).collect(),
            hazard: HazardDto::from(&snapshot.hazard),
            cage: RectDto::from(snapshot.cage),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub lives: u32,
    pub score: u32,
    pub on_track: bool,
    pub jumping: bool,
    pub just_gained_life: bool,
    pub invincible: bool,
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            x: player.x,
            y: player.y,
            vx: player.vx,
            vy: player.vy,
            lives: player.lives,
            score: player.score,
            on_track: player.on_track,
            jumping: player.jumping,
            just_gained_life: player.just_gained_life,
            invincible: player.invincible,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyDto {
    pub id: u64,
    pub kind: EnemyKindDto,
    pub x: f32,
    pub y: f32,
    pub active: bool,
    pub track: Option<usize>,
}

impl From<&EnemySnapshot> for EnemyDto {
    fn from(enemy: &EnemySnapshot) -> Self {
        Self {
            id: enemy.id,
            kind: enemy.kind.into(),
            x: enemy.x,
            y: enemy.y,
            active: enemy.active,
            track: enemy.track,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDto {
    pub id: u64,
    pub kind: ItemKindDto,
    pub x: f32,
    pub y: f32,
    pub points: u32,
    pub track: Option<usize>,
}

impl From<&ItemSnapshot> for ItemDto {
    fn from(item: &ItemSnapshot) -> Self {
        Self {
            id: item.id,
            kind: item.kind.into(),
            x: item.x,
            y: item.y,
            points: item.points,
            track: item.track,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HazardDto {
    pub x: f32,
    pub y: f32,
    pub moving_right: bool,
}

impl From<&HazardSnapshot> for HazardDto {
    fn from(hazard: &HazardSnapshot) -> Self {
        Self {
            x: hazard.x,
            y: hazard.y,
            moving_right: hazard.moving_right,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RectDto {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<Rect> for RectDto {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
        }
    }
}

/// Renders a snapshot in the session's configured mode.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    match snapshot.mode {
        CommunicationMode::Text => Ok(encode_text(snapshot)),
        CommunicationMode::Json => {
            serde_json::to_string(&ServerMessage::Snapshot(SnapshotDto::from(snapshot)))
        }
    }
}

/// Line-oriented frame: one `KIND id key=value...` line per entity.
pub fn encode_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let player = &snapshot.player;

    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "PLAYER 0 x={:.0} y={:.0} lives={} score={}",
        player.x, player.y, player.lives, player.score
    );
    for enemy in &snapshot.enemies {
        let _ = writeln!(
            out,
            "CROC {} type={} x={:.0} y={:.0} alive={}",
            enemy.id,
            enemy.kind.label(),
            enemy.x,
            enemy.y,
            u8::from(enemy.active)
        );
    }
    for item in &snapshot.items {
        let _ = writeln!(
            out,
            "FRUIT {} type={} x={:.0} y={:.0} points={} active=1",
            item.id,
            item.kind.label(),
            item.x,
            item.y,
            item.points
        );
    }
    let hazard = &snapshot.hazard;
    let _ = writeln!(
        out,
        "MARIO 0 x={:.0} y={:.0} dir={}",
        hazard.x,
        hazard.y,
        if hazard.moving_right { "R" } else { "L" }
    );
    let _ = writeln!(
        out,
        "LEVEL {} won={} speed={:.1}",
        snapshot.level,
        u8::from(snapshot.won),
        snapshot.speed_multiplier
    );

    out
}

/// Parses the line protocol: `INPUT <player> <COMMAND>` or a bare command word.
pub fn parse_legacy_command(line: &str) -> Option<InputCommand> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    let word = if first.eq_ignore_ascii_case("INPUT") {
        words.last()?
    } else {
        first
    };

    match word.to_ascii_uppercase().as_str() {
        "LEFT" => Some(InputCommand::Left),
        "RIGHT" => Some(InputCommand::Right),
        "UP" => Some(InputCommand::Up),
        "DOWN" => Some(InputCommand::Down),
        "JUMP" => Some(InputCommand::Jump),
        "STOP" => Some(InputCommand::Stop),
        _ => None,
    }
}
