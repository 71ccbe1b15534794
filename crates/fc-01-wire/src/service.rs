//! # Parcel Codec
//!
//! Encodes a [`Parcel`] into a self-describing frame and decodes frames back,
//! verifying lengths and the payload checksum.

use crate::adapters::KoopmanChecksum;
use crate::domain::{
    Parcel, ParcelCommand, ParcelError, ParcelHeader, ParcelResult, MAX_PARCEL_LEN, MAX_PAYLOAD,
    MIN_PARCEL_LEN,
};
use crate::ports::ChecksumProvider;
use shared_types::{ByteReader, ByteWriter, CodecError, NetworkId};

#[derive(Debug, Default, Clone)]
pub struct ParcelCodec<C: ChecksumProvider = KoopmanChecksum> {
    checksum: C,
}

impl<C: ChecksumProvider> ParcelCodec<C> {
    pub fn new(checksum: C) -> Self {
        Self { checksum }
    }

    /// Encode `parcel`, stamping length and checksum from its payload.
    ///
    /// The first four bytes hold the total frame length, patched after the
    /// rest of the frame is written.
    ///
    /// # Errors
    /// * `ParcelError::PayloadTooLarge` - payload over [`MAX_PAYLOAD`]
    pub fn encode(&self, parcel: &Parcel) -> ParcelResult<Vec<u8>> {
        let payload = &parcel.payload;
        if payload.len() > MAX_PAYLOAD {
            return Err(ParcelError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        let h = &parcel.header;
        let mut w = ByteWriter::with_capacity(
            MIN_PARCEL_LEN
                + h.target_peer.len()
                + h.peer_address.len()
                + h.peer_port.len()
                + payload.len(),
        );
        w.put_u32(0)
            .put_u32(h.network.0)
            .put_u16(h.version)
            .put_u16(h.command.as_u16())
            .put_u32(payload.len() as u32)
            .put_u32(self.checksum.compute(payload))
            .put_u64(h.node_id)
            .put_prefixed_str(&h.target_peer)
            .put_prefixed_str(&h.peer_address)
            .put_prefixed_str(&h.peer_port)
            .put_prefixed(payload);
        let total = w.len();
        w.patch_u32(0, total as u32);
        Ok(w.into_inner())
    }

    /// Decode one frame from the front of `data`, returning the remainder.
    ///
    /// # Errors
    /// * `ParcelError::FrameLength` - total length outside the accepted range
    /// * `ParcelError::Truncated` - a length field reads past the buffer
    /// * `ParcelError::LengthMismatch` - header length disagrees with the bytes
    /// * `ParcelError::PayloadTooLarge` - payload over [`MAX_PAYLOAD`]
    /// * `ParcelError::ChecksumMismatch` - payload fails verification
    pub fn decode<'a>(&self, data: &'a [u8]) -> ParcelResult<(Parcel, &'a [u8])> {
        let total = ByteReader::new(data).u32("parcel length")? as usize;
        check_frame_length(total)?;
        if data.len() < total {
            return Err(CodecError::Truncated {
                field: "parcel",
                needed: total,
                remaining: data.len(),
            }
            .into());
        }
        let (frame, rest) = data.split_at(total);

        let mut r = ByteReader::new(&frame[4..]);
        let network = NetworkId(r.u32("network id")?);
        let version = r.u16("version")?;
        let command = ParcelCommand::try_from(r.u16("command")?)?;
        let length = r.u32("payload length")?;
        let checksum = r.u32("checksum")?;
        let node_id = r.u64("node id")?;
        let target_peer = r.prefixed_str("target peer")?;
        let peer_address = r.prefixed_str("peer address")?;
        let peer_port = r.prefixed_str("peer port")?;
        let payload = r.prefixed("payload")?;

        if r.remaining() != 0 {
            return Err(ParcelError::LengthMismatch {
                field: "parcel",
                declared: total,
                actual: total - r.remaining(),
            });
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(ParcelError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        if length as usize != payload.len() {
            return Err(ParcelError::LengthMismatch {
                field: "payload",
                declared: length as usize,
                actual: payload.len(),
            });
        }
        let computed = self.checksum.compute(payload);
        if computed != checksum {
            return Err(ParcelError::ChecksumMismatch {
                expected: checksum,
                computed,
            });
        }

        let parcel = Parcel {
            header: ParcelHeader {
                network,
                version,
                command,
                length,
                checksum,
                node_id,
                target_peer,
                peer_address,
                peer_port,
            },
            payload: payload.to_vec(),
        };
        Ok((parcel, rest))
    }
}

/// Reject a total-length prefix before allocating for it.
pub fn check_frame_length(total: usize) -> ParcelResult<()> {
    if !(MIN_PARCEL_LEN..=MAX_PARCEL_LEN).contains(&total) {
        return Err(ParcelError::FrameLength {
            length: total,
            min: MIN_PARCEL_LEN,
            max: MAX_PARCEL_LEN,
        });
    }
    Ok(())
}
