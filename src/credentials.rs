// Copyright 2016 LambdaStack All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Credential resolution, kept separate from [`crate::config::ClientConfig`]
//! so callers can plug in their own source (environment, static pair, or a
//! chain of both) without the core caring which one produced the keys.

use crate::error::{Error, Result};

/// A resolved access/secret key pair. Cheap to clone; holds no file handles
/// or network state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Credentials {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.access_key.is_empty() || self.secret_key.is_empty()
    }
}

/// A source of [`Credentials`]. Implemented by the provided static and
/// environment providers, and by [`ChainProvider`] which tries several in
/// order.
pub trait CredentialsProvider {
    fn credentials(&self) -> Result<Credentials>;
}

/// Credentials supplied directly by the caller.
#[derive(Clone, Debug)]
pub struct StaticProvider(Credentials);

impl StaticProvider {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        StaticProvider(Credentials::new(access_key, secret_key))
    }
}

impl CredentialsProvider for StaticProvider {
    fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// Reads `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` from the process
/// environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvironmentProvider;

impl CredentialsProvider for EnvironmentProvider {
    fn credentials(&self) -> Result<Credentials> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| Error::InvalidArgument("AWS_ACCESS_KEY_ID not set".into()))?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| Error::InvalidArgument("AWS_SECRET_ACCESS_KEY not set".into()))?;

        if access_key.is_empty() || secret_key.is_empty() {
            return Err(Error::InvalidArgument(
                "AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY present but empty".into(),
            ));
        }

        Ok(Credentials::new(access_key, secret_key))
    }
}

/// Tries each provider in order, returning the first success: environment,
/// then explicit parameters, then a profile file, then IAM, minus the
/// profile-file and instance-metadata legs, which belong to the host/CLI
/// layer rather than this crate's core.
pub struct ChainProvider {
    providers: Vec<Box<dyn CredentialsProvider>>,
}

impl ChainProvider {
    pub fn new() -> Self {
        ChainProvider {
            providers: vec![Box::new(EnvironmentProvider)],
        }
    }

    pub fn with(mut self, provider: impl CredentialsProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl Default for ChainProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialsProvider for ChainProvider {
    fn credentials(&self) -> Result<Credentials> {
        for provider in &self.providers {
            if let Ok(creds) = provider.credentials() {
                return Ok(creds);
            }
        }
        Err(Error::InvalidArgument(
            "no credentials provider in the chain produced a key pair".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_round_trips() {
        let p = StaticProvider::new("AKIA", "secret");
        let creds = p.credentials().unwrap();
        assert_eq!(creds.access_key, "AKIA");
        assert_eq!(creds.secret_key, "secret");
        assert!(!creds.is_anonymous());
    }

    #[test]
    fn empty_credentials_are_anonymous() {
        assert!(Credentials::default().is_anonymous());
    }

    #[test]
    fn chain_falls_through_to_static() {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        let chain = ChainProvider::new().with(StaticProvider::new("fallback", "secret"));
        let creds = chain.credentials().unwrap();
        assert_eq!(creds.access_key, "fallback");
    }
}
