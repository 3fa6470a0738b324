//! Line-oriented text console driving the security service.
//!
//! One command per line; every command gets a reply. Errors are reported on
//! the output and the console keeps reading.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use catpoint_app::ports::{EventPublisher, ImageClassifier, SecurityRepository};
use catpoint_app::services::security_service::SecurityService;
use catpoint_domain::error::{CatpointError, ValidationError};
use catpoint_domain::image::Image;
use catpoint_domain::sensor::{Sensor, SensorType};
use catpoint_domain::status::ArmingStatus;

pub const HELP: &str = "\
commands:
  status                              show alarm and arming status
  sensors                             list sensors
  arm home | arm away | disarm        change arming status
  sensor add <type> <name>            track a new sensor (door, window, motion)
  sensor remove <type> <name>         stop tracking a sensor
  sensor activate <type> <name>       report a sensor as active
  sensor deactivate <type> <name>     report a sensor as inactive
  scan <path>                         run the cat detector on an image file
  help                                show this message
  quit                                leave the console";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Sensors,
    Arm(ArmingStatus),
    AddSensor(Sensor),
    RemoveSensor(Sensor),
    SetActive(Sensor, bool),
    Scan(PathBuf),
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}`, type `help`")]
    Unknown(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("arm expects `home` or `away`, got `{0}`")]
    ArmingMode(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default();
        match verb {
            "status" => Ok(Self::Status),
            "sensors" => Ok(Self::Sensors),
            "disarm" => Ok(Self::Arm(ArmingStatus::Disarmed)),
            "arm" => match words.next() {
                Some("home") => Ok(Self::Arm(ArmingStatus::ArmedHome)),
                Some("away") => Ok(Self::Arm(ArmingStatus::ArmedAway)),
                Some(other) => Err(CommandError::ArmingMode(other.to_string())),
                None => Err(CommandError::Missing("arming mode")),
            },
            "sensor" => {
                let action = words.next().ok_or(CommandError::Missing("sensor action"))?;
                let sensor_type: SensorType = words
                    .next()
                    .ok_or(CommandError::Missing("sensor type"))?
                    .parse()?;
                let name = words.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(CommandError::Missing("sensor name"));
                }
                let sensor = Sensor::new(name, sensor_type);
                match action {
                    "add" => Ok(Self::AddSensor(sensor)),
                    "remove" => Ok(Self::RemoveSensor(sensor)),
                    "activate" => Ok(Self::SetActive(sensor, true)),
                    "deactivate" => Ok(Self::SetActive(sensor, false)),
                    other => Err(CommandError::Unknown(format!("sensor {other}"))),
                }
            }
            "scan" => {
                let path = line.trim_start().trim_start_matches("scan").trim();
                if path.is_empty() {
                    return Err(CommandError::Missing("image path"));
                }
                Ok(Self::Scan(PathBuf::from(path)))
            }
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Text front-end over a [`SecurityService`].
pub struct Console<'a, R, C, P> {
    service: &'a SecurityService<R, C, P>,
}

impl<'a, R, C, P> Console<'a, R, C, P>
where
    R: SecurityRepository,
    C: ImageClassifier,
    P: EventPublisher,
{
    pub fn new(service: &'a SecurityService<R, C, P>) -> Self {
        Self { service }
    }

    /// Read commands from `input` until `quit` or end of input, writing one
    /// reply per command to `output`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading input or writing output fails.
    pub async fn run<I, O>(&self, input: I, output: &mut O) -> std::io::Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => match self.execute(command).await {
                    Ok(reply) => reply,
                    Err(err) => format!("error: {}", describe(&err)),
                },
                Err(err) => format!("error: {err}"),
            };
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Ok(())
    }

    /// Execute one command and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns errors propagated from the security service.
    pub async fn execute(&self, command: Command) -> Result<String, CatpointError> {
        match command {
            Command::Status => self.status().await,
            Command::Sensors => self.list_sensors().await,
            Command::Arm(status) => {
                self.service.set_arming_status(status).await?;
                self.status().await
            }
            Command::AddSensor(sensor) => {
                let label = sensor.to_string();
                self.service.add_sensor(sensor).await?;
                Ok(format!("added {label}"))
            }
            Command::RemoveSensor(sensor) => {
                let Some(tracked) = self.find(&sensor).await? else {
                    return Ok(format!("unknown sensor {}", sensor.name));
                };
                self.service.remove_sensor(tracked).await?;
                Ok(format!("removed {}", sensor.name))
            }
            Command::SetActive(sensor, active) => {
                let Some(tracked) = self.find(&sensor).await? else {
                    return Ok(format!("unknown sensor {}", sensor.name));
                };
                let updated = self
                    .service
                    .change_sensor_activation_status(tracked, active)
                    .await?;
                let alarm = self.service.alarm_status().await?;
                Ok(format!("{updated}; alarm: {}", alarm.description()))
            }
            Command::Scan(path) => {
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(err) => return Ok(format!("cannot read {}: {err}", path.display())),
                };
                let cat = self.service.process_image(&Image::from_bytes(bytes)).await?;
                let alarm = self.service.alarm_status().await?;
                let verdict = if cat {
                    "DANGER - CAT DETECTED"
                } else {
                    "no cats here"
                };
                Ok(format!("{verdict}; alarm: {}", alarm.description()))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }

    async fn find(&self, wanted: &Sensor) -> Result<Option<Sensor>, CatpointError> {
        let sensors = self.service.sensors().await?;
        Ok(sensors.get(wanted).cloned())
    }

    async fn status(&self) -> Result<String, CatpointError> {
        let alarm = self.service.alarm_status().await?;
        let arming = self.service.arming_status().await?;
        let cat = if self.service.cat_detected().await {
            "cat in view"
        } else {
            "no cat in view"
        };
        Ok(format!(
            "alarm: {} ({alarm})\narming: {} ({arming})\ncamera: {cat}",
            alarm.description(),
            arming.description(),
        ))
    }

    async fn list_sensors(&self) -> Result<String, CatpointError> {
        let sensors = self.service.sensors().await?;
        if sensors.is_empty() {
            return Ok("no sensors".to_string());
        }
        let mut reply = String::new();
        for (idx, sensor) in sensors.iter().enumerate() {
            if idx > 0 {
                reply.push('\n');
            }
            let _ = write!(reply, "{sensor}");
        }
        Ok(reply)
    }
}

/// Render an error together with its source, if any.
fn describe(err: &CatpointError) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}
