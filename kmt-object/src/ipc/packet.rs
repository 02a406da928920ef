use {
    crate::error::*,
    alloc::vec::Vec,
    kmt_hal::OsHandle,
    serde::{de::DeserializeOwned, Serialize},
};

/// Transaction id carried in the first four bytes of a packet.
pub type TxID = u32;

/// The message exchanged with the broker.
///
/// `data` is the transaction id followed by the encoded body; OS handles
/// travel out of band in `handles`.
#[derive(Debug, Default)]
pub struct MessagePacket {
    /// The data carried by the message packet
    pub data: Vec<u8>,
    /// OS handles transferred with the message
    pub handles: Vec<OsHandle>,
}

impl MessagePacket {
    /// Build a packet holding `body` under transaction `txid`.
    pub fn encode<T: Serialize>(txid: TxID, body: &T, handles: Vec<OsHandle>) -> KmtResult<Self> {
        let mut data = txid.to_ne_bytes().to_vec();
        let body = postcard::to_allocvec(body).map_err(|_| KmtError::NO_MEMORY)?;
        data.extend_from_slice(&body);
        Ok(MessagePacket { data, handles })
    }

    /// Decode the body following the transaction id.
    pub fn decode<T: DeserializeOwned>(&self) -> KmtResult<T> {
        let body = self
            .data
            .get(core::mem::size_of::<TxID>()..)
            .ok_or(KmtError::INVALID_PARAMETER)?;
        postcard::from_bytes(body).map_err(|_| KmtError::INVALID_PARAMETER)
    }

    /// Set txid (the first 4 bytes)
    pub fn set_txid(&mut self, txid: TxID) {
        if self.data.len() >= core::mem::size_of::<TxID>() {
            self.data[..4].copy_from_slice(&txid.to_ne_bytes());
        }
    }

    /// Get txid (the first 4 bytes)
    pub fn get_txid(&self) -> TxID {
        let mut bytes = [0; 4];
        if self.data.len() >= core::mem::size_of::<TxID>() {
            bytes.copy_from_slice(&self.data[..4]);
        }
        TxID::from_ne_bytes(bytes)
    }
}
