//! Signed bearer tokens: compact JWS, HS256.
//!
//! A token is `base64url(header).base64url(claims).base64url(mac)` where the
//! MAC is HMAC-SHA-256 over the first two segments. Verification checks the
//! algorithm, the signature, the expiry and the token kind. There is no
//! revocation list; a token stays valid until it expires.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// The account id.
  pub sub: Uuid,
  pub iat: i64,
  pub exp: i64,
  pub typ: TokenKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
  alg: String,
  typ: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
  #[error("signing secret must not be empty")]
  EmptySecret,

  #[error("token is malformed")]
  Malformed,

  #[error("unsupported token algorithm: {0}")]
  Algorithm(String),

  #[error("token signature does not verify")]
  Signature,

  #[error("token has expired")]
  Expired,

  #[error("expected {expected:?} token, got {actual:?}")]
  WrongKind {
    expected: TokenKind,
    actual:   TokenKind,
  },
}

/// Issues and verifies tokens of one kind under one secret.
#[derive(Clone)]
pub struct TokenKey {
  kind:     TokenKind,
  mac:      HmacSha256,
  ttl_secs: i64,
}

impl std::fmt::Debug for TokenKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenKey")
      .field("kind", &self.kind)
      .field("ttl_secs", &self.ttl_secs)
      .finish_non_exhaustive()
  }
}

impl TokenKey {
  pub fn new(
    kind: TokenKind,
    secret: &[u8],
    ttl_secs: i64,
  ) -> Result<Self, TokenError> {
    if secret.is_empty() {
      return Err(TokenError::EmptySecret);
    }
    let mac =
      HmacSha256::new_from_slice(secret).map_err(|_| TokenError::EmptySecret)?;
    Ok(Self {
      kind,
      mac,
      ttl_secs,
    })
  }

  pub fn kind(&self) -> TokenKind { self.kind }

  /// Lifetime of issued tokens, in seconds.
  pub fn ttl_secs(&self) -> i64 { self.ttl_secs }

  fn sign(&self, signing_input: &str) -> Vec<u8> {
    let mut mac = self.mac.clone();
    mac.update(signing_input.as_bytes());
    mac.finalize().into_bytes().to_vec()
  }

  /// Issue a token for `sub` valid from `now` for this key's lifetime.
  pub fn issue(
    &self,
    sub: Uuid,
    now: DateTime<Utc>,
  ) -> Result<String, TokenError> {
    let iat = now.timestamp();
    let claims = Claims {
      sub,
      iat,
      exp: iat + self.ttl_secs,
      typ: self.kind,
    };
    let header = Header {
      alg: ALG.to_owned(),
      typ: "JWT".to_owned(),
    };

    let header = serde_json::to_vec(&header).map_err(|_| TokenError::Malformed)?;
    let claims = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;
    let signing_input = format!("{}.{}", B64.encode(header), B64.encode(claims));
    let signature = B64.encode(self.sign(&signing_input));
    Ok(format!("{signing_input}.{signature}"))
  }

  /// Verify `token` and return its claims.
  pub fn verify(
    &self,
    token: &str,
    now: DateTime<Utc>,
  ) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
      (parts.next(), parts.next(), parts.next(), parts.next())
    else {
      return Err(TokenError::Malformed);
    };

    let header: Header = decode_segment(header_b64)?;
    if header.alg != ALG {
      return Err(TokenError::Algorithm(header.alg));
    }

    let signature = B64.decode(sig_b64).map_err(|_| TokenError::Malformed)?;
    let mut mac = self.mac.clone();
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac
      .verify_slice(&signature)
      .map_err(|_| TokenError::Signature)?;

    let claims: Claims = decode_segment(claims_b64)?;
    if claims.typ != self.kind {
      return Err(TokenError::WrongKind {
        expected: self.kind,
        actual:   claims.typ,
      });
    }
    if claims.exp <= now.timestamp() {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(
  segment: &str,
) -> Result<T, TokenError> {
  let bytes = B64.decode(segment).map_err(|_| TokenError::Malformed)?;
  serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn access() -> TokenKey {
    TokenKey::new(TokenKind::Access, b"access-secret", 900).unwrap()
  }

  #[test]
  fn issued_token_verifies() {
    let key = access();
    let sub = Uuid::new_v4();
    let now = Utc::now();

    let token = key.issue(sub, now).unwrap();
    assert_eq!(token.split('.').count(), 3);

    let claims = key.verify(&token, now).unwrap();
    assert_eq!(claims.sub, sub);
    assert_eq!(claims.typ, TokenKind::Access);
    assert_eq!(claims.exp - claims.iat, 900);
  }

  #[test]
  fn expired_token_is_rejected() {
    let key = access();
    let issued = Utc::now() - Duration::seconds(901);
    let token = key.issue(Uuid::new_v4(), issued).unwrap();
    assert_eq!(key.verify(&token, Utc::now()), Err(TokenError::Expired));
  }

  #[test]
  fn token_from_another_secret_is_rejected() {
    let other = TokenKey::new(TokenKind::Access, b"other", 900).unwrap();
    let token = other.issue(Uuid::new_v4(), Utc::now()).unwrap();
    assert_eq!(
      access().verify(&token, Utc::now()),
      Err(TokenError::Signature)
    );
  }

  #[test]
  fn refresh_token_is_not_an_access_token() {
    let secret = b"shared";
    let refresh = TokenKey::new(TokenKind::Refresh, secret, 60).unwrap();
    let access = TokenKey::new(TokenKind::Access, secret, 60).unwrap();
    let token = refresh.issue(Uuid::new_v4(), Utc::now()).unwrap();
    assert!(matches!(
      access.verify(&token, Utc::now()),
      Err(TokenError::WrongKind { .. })
    ));
  }

  #[test]
  fn tampered_claims_fail_signature_check() {
    let key = access();
    let token = key.issue(Uuid::new_v4(), Utc::now()).unwrap();
    let mut parts: Vec<&str> = token.split('.').collect();
    let forged = B64.encode(
      serde_json::to_vec(&Claims {
        sub: Uuid::new_v4(),
        iat: 0,
        exp: i64::MAX,
        typ: TokenKind::Access,
      })
      .unwrap(),
    );
    parts[1] = &forged;
    assert_eq!(
      key.verify(&parts.join("."), Utc::now()),
      Err(TokenError::Signature)
    );
  }

  #[test]
  fn other_algorithms_are_refused() {
    let header = B64.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let token = format!("{header}.e30.");
    assert_eq!(
      access().verify(&token, Utc::now()),
      Err(TokenError::Algorithm("none".into()))
    );
  }

  #[test]
  fn garbage_is_malformed() {
    let key = access();
    assert_eq!(key.verify("", Utc::now()), Err(TokenError::Malformed));
    assert_eq!(key.verify("a.b", Utc::now()), Err(TokenError::Malformed));
    assert_eq!(key.verify("a.b.c.d", Utc::now()), Err(TokenError::Malformed));
  }

  #[test]
  fn empty_secret_is_refused() {
    assert!(matches!(
      TokenKey::new(TokenKind::Access, b"", 900),
      Err(TokenError::EmptySecret)
    ));
  }
}
