//! 平台相关的套接字原语。
//!
//! Linux 下直接操作 `CAN_ISOTP` 套接字；其它平台的 `RawSocket` 为不可构造类型，
//! `interface_index`/`open` 恒返回 `Unsupported`。

#[cfg(target_os = "linux")]
pub(crate) use linux::{RawSocket, interface_index, open, recv, send};
#[cfg(not(target_os = "linux"))]
pub(crate) use fallback::{RawSocket, interface_index, open, recv, send};

#[cfg(target_os = "linux")]
mod linux {
    use std::{
        io::{self, Read, Write},
        mem,
        os::fd::AsRawFd,
    };

    use nix::{libc, net::if_::if_nametoindex};
    use socket2::{Domain, Protocol, Socket, Type};

    pub(crate) type RawSocket = Socket;

    // linux/can.h
    const CAN_ISOTP: libc::c_int = 6;

    /// `struct sockaddr_can` 中 ISOTP 使用的 `tp` 分支，尾部保留字段补齐联合体的 16 字节。
    #[repr(C)]
    struct SockaddrCanTp {
        can_family: libc::sa_family_t,
        can_ifindex: libc::c_int,
        rx_id: u32,
        tx_id: u32,
        reserved: u64,
    }

    pub(crate) fn interface_index(interface: &str) -> io::Result<u32> {
        if_nametoindex(interface).map_err(io::Error::from)
    }

    /// 返回已绑定到 `ifindex`、处于非阻塞模式的套接字。
    ///
    /// 任意一步失败时套接字随 `Socket` 的 `Drop` 一并关闭。
    pub(crate) fn open(ifindex: u32, rx_id: u32, tx_id: u32) -> io::Result<Socket> {
        let socket = Socket::new(
            Domain::from(libc::AF_CAN),
            Type::DGRAM,
            Some(Protocol::from(CAN_ISOTP)),
        )?;
        let addr = SockaddrCanTp {
            can_family: libc::AF_CAN as libc::sa_family_t,
            can_ifindex: ifindex as libc::c_int,
            rx_id,
            tx_id,
            reserved: 0,
        };
        // SAFETY: `addr` 为 `#[repr(C)]` 且在调用期间存活，长度与结构体大小一致。
        let rc = unsafe {
            libc::bind(
                socket.as_raw_fd(),
                (&addr as *const SockaddrCanTp).cast::<libc::sockaddr>(),
                mem::size_of::<SockaddrCanTp>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    pub(crate) fn recv(socket: &mut Socket, buf: &mut [u8]) -> io::Result<usize> {
        socket.read(buf)
    }

    pub(crate) fn send(socket: &mut Socket, payload: &[u8]) -> io::Result<usize> {
        socket.write(payload)
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback {
    use std::{convert::Infallible, io};

    pub(crate) type RawSocket = Infallible;

    pub(crate) fn interface_index(_interface: &str) -> io::Result<u32> {
        Err(unsupported())
    }

    pub(crate) fn open(_ifindex: u32, _rx_id: u32, _tx_id: u32) -> io::Result<RawSocket> {
        Err(unsupported())
    }

    fn unsupported() -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "CAN_ISOTP sockets are only available on Linux",
        )
    }

    pub(crate) fn recv(socket: &mut RawSocket, _buf: &mut [u8]) -> io::Result<usize> {
        match *socket {}
    }

    pub(crate) fn send(socket: &mut RawSocket, _payload: &[u8]) -> io::Result<usize> {
        match *socket {}
    }
}
