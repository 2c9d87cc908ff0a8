//! Job execution.
//!
//! The single dispatch table behind both paths: worker threads call
//! [`execute`] on packets they receive over the wire, and the pool's
//! in-process fallback calls it directly when no workers are running.
//! Either way a request packet goes in and the matching result packet
//! comes out.

use btx_primitives::ec::{PrivateKey, PublicKey, Signature};
use btx_primitives::hash::sha256d;
use btx_transaction::{CoinView, MutableTransaction, ScriptVerifier, StandardVerifier};

use crate::error::WorkerError;
use crate::packets::{JobError, Packet};

/// Offset of the nonce field inside an 80-byte block header.
const NONCE_OFFSET: usize = 76;

/// Serialized block header size.
const HEADER_SIZE: usize = 80;

/// Executes a request packet and returns its result packet.
///
/// # Errors
/// Job failures (script rejection, bad signatures, invalid parameters)
/// come back as errors; the caller decides whether to surface them as
/// an error-result packet or a local `Err`.
pub fn execute(packet: Packet) -> Result<Packet, WorkerError> {
    match packet {
        Packet::Check { tx, view, flags } => {
            tx.check(&view, &StandardVerifier, flags)?;
            Ok(Packet::CheckResult)
        }
        Packet::Sign {
            tx,
            view,
            rings,
            sighash_type,
        } => {
            let mut mtx = MutableTransaction::from_tx(tx, view);
            let total = mtx.sign(&rings, sighash_type)?;
            let scripts = mtx.inputs.iter().map(|input| input.script.clone()).collect();
            let witnesses = mtx.inputs.iter().map(|input| input.witness.clone()).collect();
            Ok(Packet::SignResult {
                total: total as u32,
                scripts,
                witnesses,
            })
        }
        Packet::CheckInput {
            tx,
            index,
            coin,
            flags,
        } => {
            let input = tx
                .inputs()
                .get(index as usize)
                .ok_or_else(|| WorkerError::InvalidParameter(format!(
                    "input index {} out of range",
                    index
                )))?;
            StandardVerifier.verify(
                &input.script,
                &input.witness,
                &coin.script,
                &tx,
                index as usize,
                coin.value,
                flags,
            )?;
            Ok(Packet::CheckInputResult)
        }
        Packet::SignInput {
            tx,
            index,
            coin,
            ring,
            sighash_type,
        } => {
            let index = index as usize;
            if index >= tx.inputs().len() {
                return Err(WorkerError::InvalidParameter(format!(
                    "input index {} out of range",
                    index
                )));
            }
            let mut mtx = MutableTransaction::from_tx(tx, CoinView::new());
            mtx.script_input(index, &coin, &ring)?;
            let signed = mtx.sign_input(index, &coin, &ring, sighash_type)?;
            Ok(Packet::SignInputResult {
                signed,
                script: mtx.inputs[index].script.clone(),
                witness: mtx.inputs[index].witness.clone(),
            })
        }
        Packet::EcVerify {
            hash,
            signature,
            key,
        } => Ok(Packet::EcVerifyResult {
            valid: ec_verify(&hash, &signature, &key),
        }),
        Packet::EcSign { hash, key } => {
            let key = PrivateKey::from_bytes(&key)?;
            let signature = key.sign(&hash)?.to_der();
            Ok(Packet::EcSignResult { signature })
        }
        Packet::Mine {
            header,
            target,
            min,
            max,
        } => Ok(Packet::MineResult {
            nonce: mine(&header, &target, min, max)?,
        }),
        Packet::Scrypt {
            passphrase,
            salt,
            n,
            r,
            p,
            length,
        } => Ok(Packet::ScryptResult {
            key: derive_scrypt(&passphrase, &salt, n, r, p, length as usize)?,
        }),
        other => Err(WorkerError::Packet {
            cmd: other.cmd(),
            reason: "not a request packet".into(),
        }),
    }
}

/// Converts a job failure into its wire form for an error-result reply.
pub fn job_error(err: &WorkerError) -> JobError {
    match err {
        WorkerError::Transaction(inner) => JobError::from_failure(inner),
        WorkerError::Script(inner) => {
            JobError::from_failure(&btx_transaction::TransactionError::Script(match inner {
                btx_script::ScriptError::Verify { code, op, ip } => {
                    btx_script::ScriptError::Verify {
                        code: *code,
                        op: *op,
                        ip: *ip,
                    }
                }
                other => btx_script::ScriptError::InvalidScript(other.to_string()),
            }))
        }
        other => JobError {
            message: other.to_string(),
            code: "ERR".into(),
            op: 0,
            ip: 0,
        },
    }
}

fn ec_verify(hash: &[u8; 32], signature: &[u8], key: &[u8]) -> bool {
    let Ok(key) = PublicKey::from_bytes(key) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(signature) else {
        return false;
    };
    key.verify(hash, &signature)
}

/// Scans `[min, max]` for a nonce whose double-SHA256 header hash is at
/// or below the big-endian target.
fn mine(header: &[u8], target: &[u8; 32], min: u32, max: u32) -> Result<Option<u32>, WorkerError> {
    if header.len() != HEADER_SIZE {
        return Err(WorkerError::InvalidParameter(format!(
            "header must be {} bytes, got {}",
            HEADER_SIZE,
            header.len()
        )));
    }
    let mut header = header.to_vec();
    let mut nonce = min;
    loop {
        header[NONCE_OFFSET..NONCE_OFFSET + 4].copy_from_slice(&nonce.to_le_bytes());
        if meets_target(&sha256d(&header), target) {
            return Ok(Some(nonce));
        }
        if nonce == max {
            return Ok(None);
        }
        nonce += 1;
    }
}

// Hash is little-endian on the wire; compare it to the target as a
// big-endian number.
fn meets_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    for (hash_byte, target_byte) in hash.iter().rev().zip(target.iter()) {
        if hash_byte < target_byte {
            return true;
        }
        if hash_byte > target_byte {
            return false;
        }
    }
    true
}

fn derive_scrypt(
    passphrase: &[u8],
    salt: &[u8],
    n: u32,
    r: u32,
    p: u32,
    length: usize,
) -> Result<Vec<u8>, WorkerError> {
    if n < 2 || !n.is_power_of_two() {
        return Err(WorkerError::InvalidParameter(format!(
            "scrypt N must be a power of two greater than one, got {}",
            n
        )));
    }
    let log_n = n.trailing_zeros() as u8;
    let params = scrypt::Params::new(log_n, r, p, length)
        .map_err(|err| WorkerError::InvalidParameter(err.to_string()))?;
    let mut key = vec![0u8; length];
    scrypt::scrypt(passphrase, salt, &params, &mut key)
        .map_err(|err| WorkerError::InvalidParameter(err.to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ec_sign_then_verify() {
        let key = PrivateKey::generate();
        let hash = sha256d(b"job dispatch");
        let signed = execute(Packet::EcSign {
            hash,
            key: key.to_bytes(),
        })
        .unwrap();
        let Packet::EcSignResult { signature } = signed else {
            panic!("wrong result packet");
        };
        let verified = execute(Packet::EcVerify {
            hash,
            signature,
            key: key.public_key().to_compressed(),
        })
        .unwrap();
        assert!(matches!(verified, Packet::EcVerifyResult { valid: true }));
    }

    #[test]
    fn ec_verify_garbage_is_false_not_error() {
        let result = execute(Packet::EcVerify {
            hash: [0u8; 32],
            signature: vec![0xde, 0xad],
            key: vec![0xbe, 0xef],
        })
        .unwrap();
        assert!(matches!(result, Packet::EcVerifyResult { valid: false }));
    }

    #[test]
    fn mine_trivial_target() {
        let result = execute(Packet::Mine {
            header: vec![0u8; 80],
            target: [0xff; 32],
            min: 5,
            max: 10,
        })
        .unwrap();
        // An all-ones target accepts any hash, so the first nonce wins.
        assert!(matches!(result, Packet::MineResult { nonce: Some(5) }));
    }

    #[test]
    fn mine_impossible_target_exhausts_range() {
        let result = execute(Packet::Mine {
            header: vec![0u8; 80],
            target: [0x00; 32],
            min: 0,
            max: 16,
        })
        .unwrap();
        assert!(matches!(result, Packet::MineResult { nonce: None }));
    }

    #[test]
    fn mine_rejects_short_header() {
        assert!(execute(Packet::Mine {
            header: vec![0u8; 79],
            target: [0xff; 32],
            min: 0,
            max: 0,
        })
        .is_err());
    }

    #[test]
    fn scrypt_rfc7914_vector() {
        let result = execute(Packet::Scrypt {
            passphrase: Vec::new(),
            salt: Vec::new(),
            n: 16,
            r: 1,
            p: 1,
            length: 64,
        })
        .unwrap();
        let Packet::ScryptResult { key } = result else {
            panic!("wrong result packet");
        };
        assert_eq!(
            hex::encode(key),
            "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442\
             fcd0069ded0948f8326a753a0fc81f17e8d3e0fb2e0d3628cf35e20c38d18906"
        );
    }

    #[test]
    fn scrypt_rejects_non_power_of_two() {
        assert!(execute(Packet::Scrypt {
            passphrase: Vec::new(),
            salt: Vec::new(),
            n: 15,
            r: 1,
            p: 1,
            length: 32,
        })
        .is_err());
    }

    #[test]
    fn result_packets_are_not_requests() {
        assert!(execute(Packet::CheckResult).is_err());
    }
}
