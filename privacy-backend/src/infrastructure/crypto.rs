// privacy-backend/src/infrastructure/crypto.rs

//! チェックサム・バックアップ暗号化・検証コード・匿名化ハッシュ

use crate::error::{AppError, AppResult};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SALT_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

const ANONYMIZATION_DOMAIN: &str = "privacy-backend/anonymization/v1:";

/// SHA-256 content checksum (hex)
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// HMAC-SHA256(master, backup_id || salt) でバックアップごとの鍵を導出
pub fn derive_backup_key(master: &[u8], backup_id: Uuid, salt: &[u8]) -> AppResult<[u8; 32]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(master)
        .map_err(|_| AppError::InternalServerError("Invalid master key".to_string()))?;
    mac.update(backup_id.as_bytes());
    mac.update(salt);
    Ok(mac.finalize().into_bytes().into())
}

/// AES-256-GCM で暗号化する。出力は nonce(12) || ciphertext+tag
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> AppResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| AppError::InternalServerError("Encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// `seal` の逆。改ざんされていれば IntegrityCheckFailed
pub fn open(key: &[u8; 32], sealed: &[u8]) -> AppResult<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return Err(AppError::IntegrityCheckFailed(
            "Encrypted payload is truncated".to_string(),
        ));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| AppError::IntegrityCheckFailed("Authentication tag mismatch".to_string()))
}

/// バックアップBLOB用: salt(32) || nonce(12) || ciphertext
pub fn encrypt_backup(master: &[u8], backup_id: Uuid, plaintext: &[u8]) -> AppResult<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let key = derive_backup_key(master, backup_id, &salt)?;

    let sealed = seal(&key, plaintext)?;
    let mut blob = Vec::with_capacity(SALT_LEN + sealed.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

pub fn decrypt_backup(master: &[u8], backup_id: Uuid, blob: &[u8]) -> AppResult<Vec<u8>> {
    if blob.len() < SALT_LEN + NONCE_LEN {
        return Err(AppError::IntegrityCheckFailed(
            "Encrypted backup is truncated".to_string(),
        ));
    }
    let (salt, sealed) = blob.split_at(SALT_LEN);
    let key = derive_backup_key(master, backup_id, salt)?;
    open(&key, sealed)
}

/// 削除確認用の検証コード (16 bytes の OS 乱数を hex 化した 32 文字)
pub fn generate_verification_code() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 定数時間比較
pub fn codes_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// ユーザーIDから決定的に導出される匿名化用ハッシュ (16 hex chars)
pub fn anonymization_hash(user_id: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ANONYMIZATION_DOMAIN.as_bytes());
    hasher.update(user_id.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
