use std::{borrow::Cow, io, net::SocketAddr};

use crate::{
    Deserialize, Serialize,
    specs::{
        machine_learning::{ParamsSpec, ShardSpec},
        worker::WorkerSpec,
    },
};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_KIND: Header = 0;
const CONTROL_KIND: Header = 1;
const PARAMS_KIND: Header = 2;
const FEATURES_KIND: Header = 3;
const LABELS_KIND: Header = 4;

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    Params(&'a [f32]),
    Features(&'a [f32]),
    Labels(&'a [u32]),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CreateWorker(WorkerSpec),
    Benchmark { workload: usize },
    Score { value: f64 },
    AssignData(ShardSpec),
    Ack,
    LocalUpdate(ParamsSpec),
    Updated(ParamsSpec),
    Register { addr: SocketAddr },
    ListWorkers,
    Workers { addrs: Vec<SocketAddr> },
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// Returns a short name for the kind of this message, useful for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(_) => "control",
            Msg::Err(_) => "err",
            Msg::Data(Payload::Params(_)) => "data/params",
            Msg::Data(Payload::Features(_)) => "data/features",
            Msg::Data(Payload::Labels(_)) => "data/labels",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind_byte<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }

    fn misaligned<T>(err: bytemuck::PodCastError) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received a numeric payload that can't be cast: {err}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_KIND.to_be_bytes());
                Ok(Some(e.as_bytes()))
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_KIND.to_be_bytes());
                serde_json::to_writer(buf, cmd)?;
                Ok(None)
            }
            Msg::Data(payload) => {
                let (kind, bytes): (Header, &[u8]) = match payload {
                    Payload::Params(params) => (PARAMS_KIND, bytemuck::cast_slice(params)),
                    Payload::Features(features) => (FEATURES_KIND, bytemuck::cast_slice(features)),
                    Payload::Labels(labels) => (LABELS_KIND, bytemuck::cast_slice(labels)),
                };

                buf.extend_from_slice(&kind.to_be_bytes());
                Ok(Some(bytes))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        let Some((kind_buf, rest)) = buf.split_first_chunk::<HEADER_SIZE>() else {
            return Self::buf_is_too_small(buf.len());
        };

        match Header::from_be_bytes(*kind_buf) {
            ERR_KIND => {
                let string = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL_KIND => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            PARAMS_KIND => match bytemuck::try_cast_slice(rest) {
                Ok(nums) => Ok(Self::Data(Payload::Params(nums))),
                Err(e) => Self::misaligned(e),
            },
            FEATURES_KIND => match bytemuck::try_cast_slice(rest) {
                Ok(nums) => Ok(Self::Data(Payload::Features(nums))),
                Err(e) => Self::misaligned(e),
            },
            LABELS_KIND => match bytemuck::try_cast_slice(rest) {
                Ok(nums) => Ok(Self::Data(Payload::Labels(nums))),
                Err(e) => Self::misaligned(e),
            },
            kind => Self::invalid_kind_byte(kind),
        }
    }
}
