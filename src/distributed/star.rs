use std::{borrow::Cow, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpListener, TcpStream, ToSocketAddrs,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time::{self, Instant},
};

use super::{ProcessGroup, ROOT};
use crate::error::{Result, TrainErr};

const CONNECT_RETRY: Duration = Duration::from_millis(500);

/// Both ends of the channel to another rank.
struct Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
}

/// A process group with a star topology centred on rank 0.
///
/// Rank 0 holds one link per other rank (the link at index `i` leads to rank
/// `i + 1`), every other rank holds a single link to rank 0.
pub struct StarGroup<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rank: usize,
    world_size: usize,
    links: Vec<Link<R, W>>,
    buf: Vec<u32>,
}

/// A `StarGroup` running over TCP connections.
pub type TcpGroup = StarGroup<OwnedReadHalf, OwnedWriteHalf>;

impl<R, W> StarGroup<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Builds the coordinating side (rank 0) of a group.
    ///
    /// Every peer must introduce itself with a `Hello`, which is answered with
    /// a `Welcome` or with an error message explaining the rejection.
    ///
    /// # Arguments
    /// * `world_size` - The amount of processes in the group, including this one.
    /// * `peers` - One channel per other rank, in any order.
    ///
    /// # Returns
    /// The group or an error if a peer was rejected or missing.
    pub async fn coordinate<I>(world_size: usize, peers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (OnoReceiver<R>, OnoSender<W>)>,
    {
        let mut slots: Vec<Option<Link<R, W>>> = (1..world_size).map(|_| None).collect();
        let mut buf = Vec::new();

        for (mut rx, mut tx) in peers {
            let (rank, peer_world_size) = match rx.recv_into(&mut buf).await? {
                Msg::Control(Command::Hello { rank, world_size }) => (rank, world_size),
                other => {
                    return Err(TrainErr::Protocol {
                        rank: ROOT,
                        msg: format!("expected hello, got {}", other.kind()),
                    });
                }
            };

            let rejection = if peer_world_size != world_size {
                Some(format!(
                    "world size mismatch, rank {rank} expects {peer_world_size} but the group has {world_size}"
                ))
            } else if rank == ROOT || rank >= world_size {
                Some(format!("rank {rank} is not a valid peer rank for world size {world_size}"))
            } else if slots[rank - 1].is_some() {
                Some(format!("rank {rank} already joined"))
            } else {
                None
            };

            if let Some(reason) = rejection {
                let msg = Msg::Err(Cow::Borrowed(reason.as_str()));
                tx.send(&msg).await?;
                return Err(TrainErr::Protocol { rank, msg: reason });
            }

            tx.send(&Msg::Control(Command::Welcome)).await?;
            debug!(rank = rank; "peer joined the group");
            slots[rank - 1] = Some(Link { rx, tx });
        }

        let links = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| TrainErr::Protocol {
                    rank: i + 1,
                    msg: "never joined the group".into(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rank: ROOT,
            world_size,
            links,
            buf,
        })
    }

    /// Builds a non coordinating side of a group by introducing itself to rank 0.
    ///
    /// # Arguments
    /// * `rank` - This process' rank, in `1..world_size`.
    /// * `world_size` - The amount of processes in the group.
    /// * `rx` - Receiving end of the channel to rank 0.
    /// * `tx` - Sending end of the channel to rank 0.
    ///
    /// # Returns
    /// The group or an error if rank 0 rejected this process.
    pub async fn join(
        rank: usize,
        world_size: usize,
        mut rx: OnoReceiver<R>,
        mut tx: OnoSender<W>,
    ) -> Result<Self> {
        if rank == ROOT || rank >= world_size {
            return Err(TrainErr::InvalidRank { rank, world_size });
        }

        tx.send(&Msg::Control(Command::Hello { rank, world_size }))
            .await?;

        let mut buf = Vec::new();
        match rx.recv_into(&mut buf).await? {
            Msg::Control(Command::Welcome) => {}
            Msg::Err(detail) => {
                return Err(TrainErr::Protocol {
                    rank: ROOT,
                    msg: detail.into_owned(),
                });
            }
            other => {
                return Err(TrainErr::Protocol {
                    rank: ROOT,
                    msg: format!("expected welcome, got {}", other.kind()),
                });
            }
        }

        Ok(Self {
            rank,
            world_size,
            links: vec![Link { rx, tx }],
            buf,
        })
    }
}

impl<R, W> ProcessGroup for StarGroup<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    async fn reduce(&mut self, values: &mut [f32], dst: usize) -> Result<()> {
        let Self {
            rank,
            world_size,
            links,
            buf,
        } = self;

        if dst >= *world_size {
            return Err(TrainErr::InvalidRank {
                rank: dst,
                world_size: *world_size,
            });
        }

        if *rank == ROOT {
            for (i, link) in links.iter_mut().enumerate() {
                let contribution = recv_losses(link, buf, i + 1, values.len()).await?;
                values
                    .iter_mut()
                    .zip(contribution)
                    .for_each(|(v, c)| *v += c);
            }

            if dst != ROOT {
                let msg = Msg::Data(Payload::Losses(values));
                links[dst - 1].tx.send(&msg).await?;
            }

            return Ok(());
        }

        let link = &mut links[0];
        link.tx.send(&Msg::Data(Payload::Losses(values))).await?;

        if dst == *rank {
            let sum = recv_losses(link, buf, ROOT, values.len()).await?;
            values.copy_from_slice(sum);
        }

        Ok(())
    }
}

/// Receives a losses vector of exactly `expected` values from the rank `peer`.
async fn recv_losses<'buf, R, W>(
    link: &mut Link<R, W>,
    buf: &'buf mut Vec<u32>,
    peer: usize,
    expected: usize,
) -> Result<&'buf [f32]>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match link.rx.recv_into(buf).await? {
        Msg::Data(Payload::Losses(losses)) if losses.len() == expected => Ok(losses),
        Msg::Data(Payload::Losses(losses)) => Err(TrainErr::LengthMismatch {
            rank: peer,
            got: losses.len(),
            expected,
        }),
        Msg::Err(detail) => Err(TrainErr::Protocol {
            rank: peer,
            msg: detail.into_owned(),
        }),
        other => Err(TrainErr::Protocol {
            rank: peer,
            msg: format!("expected losses, got {}", other.kind()),
        }),
    }
}

impl TcpGroup {
    /// Binds `addr` and coordinates a group of `world_size` processes as rank 0.
    pub async fn bind<A: ToSocketAddrs>(addr: A, world_size: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Self::listen(listener, world_size).await
    }

    /// Accepts `world_size - 1` peers on `listener` and coordinates the group as rank 0.
    pub async fn listen(listener: TcpListener, world_size: usize) -> Result<Self> {
        let npeers = world_size.saturating_sub(1);
        info!(world_size = world_size; "waiting for {npeers} peers on {}", listener.local_addr()?);

        let mut peers = Vec::with_capacity(npeers);
        while peers.len() < npeers {
            let (stream, addr) = listener.accept().await?;
            stream.set_nodelay(true)?;
            debug!("peer connected from {addr}");

            let (rx, tx) = stream.into_split();
            peers.push(comms::channel(rx, tx));
        }

        Self::coordinate(world_size, peers).await
    }

    /// Connects to rank 0 at `addr` and joins the group as `rank`.
    ///
    /// Connection attempts are retried until `timeout` elapses, rank 0 may
    /// still be starting up.
    pub async fn connect<A>(
        addr: A,
        rank: usize,
        world_size: usize,
        timeout: Duration,
    ) -> Result<Self>
    where
        A: ToSocketAddrs + Copy,
    {
        let deadline = Instant::now() + timeout;

        let stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(e) if Instant::now() < deadline => {
                    warn!(rank = rank; "failed to reach rank 0: {e}, retrying...");
                    time::sleep(CONNECT_RETRY).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        stream.set_nodelay(true)?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        Self::join(rank, world_size, rx, tx).await
    }
}
