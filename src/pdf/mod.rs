pub mod reader;
pub mod writer;

use sha2::{Digest, Sha256};

/// ドキュメントのバイト列から識別子（SHA-256の16進文字列）を計算する。
///
/// レンダーキャッシュとセッションストアのキーに使用する。
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
