//! Argument vectors for every external operation.
//!
//! Builders only assemble `Invocation`s; running them is the caller's job.

use std::path::Path;

use crate::keystore::runner::Invocation;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `keytool` bound to one keystore file and its store password.
#[derive(Debug, Clone, Copy)]
pub struct Keytool<'a> {
    pub program: &'a str,
    pub keystore: &'a Path,
    pub storepass: &'a str,
}

/// Parameters collected by the generate-key-pair forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairRequest {
    pub alias: String,
    pub algorithm: String,
    /// RSA/DSA key size; ignored for EC.
    pub key_size: Option<u32>,
    /// EC named curve; ignored for RSA/DSA.
    pub named_curve: Option<String>,
    pub dname: String,
    pub validity_days: i64,
    /// `YYYY/MM/DD HH:MM:SS`
    pub start_date: String,
    pub sigalg: String,
    pub version3: bool,
}

impl<'a> Keytool<'a> {
    pub fn new(program: &'a str, keystore: &'a Path, storepass: &'a str) -> Self {
        Self {
            program,
            keystore,
            storepass,
        }
    }

    fn base(&self, command: &str) -> Invocation {
        Invocation::new(self.program)
            .arg(command)
            .args(["-keystore".to_string(), path_arg(self.keystore)])
            .args(["-storepass", self.storepass])
    }

    /// Plain listing, used to check a password.
    pub fn list(&self) -> Invocation {
        self.base("-list")
    }

    pub fn list_verbose(&self) -> Invocation {
        self.base("-list").arg("-v")
    }

    /// PEM certificates of an entry's chain on stdout.
    pub fn list_chain_rfc(&self, alias: &str) -> Invocation {
        self.base("-list").args(["-rfc", "-alias", alias])
    }

    pub fn delete(&self, alias: &str) -> Invocation {
        self.base("-delete").args(["-alias", alias])
    }

    pub fn change_alias(&self, alias: &str, new_alias: &str) -> Invocation {
        self.base("-changealias")
            .args(["-alias", alias, "-destalias", new_alias])
    }

    pub fn store_password(&self, new_password: &str) -> Invocation {
        self.base("-storepasswd").args(["-new", new_password])
    }

    /// Re-key one entry. `self.storepass` must already be the new store password.
    pub fn key_password(&self, alias: &str, old_password: &str, new_password: &str) -> Invocation {
        self.base("-keypasswd").args([
            "-alias",
            alias,
            "-keypass",
            old_password,
            "-new",
            new_password,
        ])
    }

    pub fn generate_key_pair(&self, request: &KeyPairRequest) -> Invocation {
        let validity = request.validity_days.to_string();
        let mut inv = self.base("-genkeypair").args([
            "-alias",
            request.alias.as_str(),
            "-keyalg",
            request.algorithm.as_str(),
            "-keypass",
            self.storepass,
            "-dname",
            request.dname.as_str(),
            "-validity",
            validity.as_str(),
            "-startdate",
            request.start_date.as_str(),
            "-sigalg",
            request.sigalg.as_str(),
        ]);
        if request.algorithm == "EC" {
            let curve = match request.named_curve.as_deref() {
                None | Some("") | Some("prime256v1") => "secp256r1",
                Some(other) => other,
            };
            inv = inv.args(["-groupname", curve]);
        } else if let Some(size) = request.key_size {
            inv = inv.args(["-keysize".to_string(), size.to_string()]);
        }
        if request.version3 {
            inv = inv.args(["-ext", "BasicConstraints:critical=ca:false"]);
        }
        inv
    }

    pub fn import_certificate(&self, alias: &str, file: &Path) -> Invocation {
        self.base("-importcert")
            .args(["-alias", alias])
            .args(["-file".to_string(), path_arg(file)])
            .arg("-noprompt")
    }

    /// Import one alias from a PKCS #12 file into this keystore.
    pub fn import_pkcs12(&self, source: &Path, source_password: &str, alias: &str) -> Invocation {
        Invocation::new(self.program)
            .arg("-importkeystore")
            .args(["-srckeystore".to_string(), path_arg(source)])
            .args(["-srcstoretype", "PKCS12"])
            .args(["-destkeystore".to_string(), path_arg(self.keystore)])
            .args(["-deststorepass", self.storepass])
            .args(["-destkeypass", self.storepass])
            .args(["-srcstorepass", source_password])
            .args(["-alias", alias, "-destalias", alias])
            .arg("-noprompt")
    }

    pub fn export_certificate(&self, alias: &str, file: &Path, pem: bool) -> Invocation {
        let inv = self
            .base("-exportcert")
            .args(["-alias", alias])
            .args(["-file".to_string(), path_arg(file)]);
        if pem { inv.arg("-rfc") } else { inv }
    }

    /// Copy one key entry into a fresh PKCS #12 file.
    pub fn export_key_pair(&self, alias: &str, file: &Path, export_password: &str) -> Invocation {
        Invocation::new(self.program)
            .arg("-importkeystore")
            .args(["-srckeystore".to_string(), path_arg(self.keystore)])
            .args(["-srcstorepass", self.storepass])
            .args(["-srckeypass", self.storepass])
            .args(["-srcalias", alias])
            .args(["-destkeystore".to_string(), path_arg(file)])
            .args(["-deststoretype", "PKCS12"])
            .args(["-deststorepass", export_password])
            .args(["-destkeypass", export_password])
            .arg("-noprompt")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Openssl<'a> {
    pub program: &'a str,
}

impl<'a> Openssl<'a> {
    pub fn new(program: &'a str) -> Self {
        Self { program }
    }

    /// Bundle a certificate chain and PKCS #8 key into a PKCS #12 file.
    pub fn pkcs8_to_pkcs12(
        &self,
        certificates: &Path,
        key: &Path,
        out: &Path,
        alias: &str,
        out_password: &str,
        key_password: Option<&str>,
    ) -> Invocation {
        let inv = Invocation::new(self.program)
            .args(["pkcs12", "-export"])
            .args(["-in".to_string(), path_arg(certificates)])
            .args(["-inkey".to_string(), path_arg(key)])
            .args(["-out".to_string(), path_arg(out)])
            .args(["-name", alias])
            .args(["-passout".to_string(), format!("pass:{out_password}")]);
        match key_password {
            Some(pw) if !pw.is_empty() => inv.args(["-passin".to_string(), format!("pass:{pw}")]),
            _ => inv,
        }
    }

    /// Handshake with `host:port` and print the presented chain.
    pub fn fetch_certificates(&self, host: &str, port: u16) -> Invocation {
        Invocation::new(self.program)
            .args(["s_client", "-showcerts", "-servername", host])
            .args(["-connect".to_string(), format!("{host}:{port}")])
    }

    pub fn public_key(&self, certificate: &Path, out: &Path) -> Invocation {
        Invocation::new(self.program)
            .arg("x509")
            .args(["-in".to_string(), path_arg(certificate)])
            .args(["-pubkey", "-noout"])
            .args(["-out".to_string(), path_arg(out)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(algorithm: &str) -> KeyPairRequest {
        KeyPairRequest {
            alias: "web".to_string(),
            algorithm: algorithm.to_string(),
            key_size: Some(2048),
            named_curve: Some("prime256v1".to_string()),
            dname: "CN=web".to_string(),
            validity_days: 365,
            start_date: "2024/01/01 00:00:00".to_string(),
            sigalg: "SHA256withRSA".to_string(),
            version3: true,
        }
    }

    #[test]
    fn test_generate_rsa_uses_keysize() {
        let ks = PathBuf::from("/tmp/work.jks");
        let inv = Keytool::new("keytool", &ks, "pw").generate_key_pair(&request("RSA"));
        assert_eq!(inv.args[0], "-genkeypair");
        assert_eq!(inv.value_of("-keysize"), Some("2048"));
        assert_eq!(inv.value_of("-groupname"), None);
        assert_eq!(inv.value_of("-validity"), Some("365"));
        assert_eq!(inv.value_of("-startdate"), Some("2024/01/01 00:00:00"));
        assert_eq!(inv.value_of("-ext"), Some("BasicConstraints:critical=ca:false"));
    }

    #[test]
    fn test_generate_ec_uses_group_name() {
        let ks = PathBuf::from("/tmp/work.jks");
        let mut req = request("EC");
        req.version3 = false;
        let inv = Keytool::new("keytool", &ks, "pw").generate_key_pair(&req);
        assert_eq!(inv.value_of("-groupname"), Some("secp256r1"));
        assert_eq!(inv.value_of("-keysize"), None);
        assert!(!inv.has_flag("-ext"));

        req.named_curve = Some("secp384r1".to_string());
        let inv = Keytool::new("keytool", &ks, "pw").generate_key_pair(&req);
        assert_eq!(inv.value_of("-groupname"), Some("secp384r1"));
    }

    #[test]
    fn test_pkcs8_conversion_passin_only_when_given() {
        let openssl = Openssl::new("openssl");
        let (c, k, o) = (PathBuf::from("c.pem"), PathBuf::from("k.pem"), PathBuf::from("o.p12"));
        let plain = openssl.pkcs8_to_pkcs12(&c, &k, &o, "k", "pw", None);
        assert!(!plain.has_flag("-passin"));
        assert_eq!(plain.value_of("-passout"), Some("pass:pw"));

        let enc = openssl.pkcs8_to_pkcs12(&c, &k, &o, "k", "pw", Some("secret"));
        assert_eq!(enc.value_of("-passin"), Some("pass:secret"));
    }

    #[test]
    fn test_export_certificate_pem_flag() {
        let ks = PathBuf::from("w.jks");
        let out = PathBuf::from("out.crt");
        let tool = Keytool::new("keytool", &ks, "pw");
        assert!(tool.export_certificate("a", &out, true).has_flag("-rfc"));
        assert!(!tool.export_certificate("a", &out, false).has_flag("-rfc"));
    }

    #[test]
    fn test_key_password_uses_old_and_new() {
        let ks = PathBuf::from("w.jks");
        let inv = Keytool::new("keytool", &ks, "new").key_password("a", "old", "new");
        assert_eq!(inv.value_of("-storepass"), Some("new"));
        assert_eq!(inv.value_of("-keypass"), Some("old"));
        assert_eq!(inv.value_of("-new"), Some("new"));
    }
}
