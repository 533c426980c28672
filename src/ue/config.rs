//! UERANSIM `nr-ue` configuration rendering
//!
//! The template is fixed; only the subscriber identity, the device identity
//! and the slice differentiator vary with the UE id. The session DNN is the
//! same per-UE DNN announced to the SMF, so traffic from UE `n` lands on UPF
//! `upf-ue<n>`.

use std::fmt::Write as _;

use super::{dnn_name, UeId};

/// Home PLMN mobile country code
pub const MCC: &str = "208";
/// Home PLMN mobile network code
pub const MNC: &str = "93";
/// Slice/service type used by every UE
pub const SST: u8 = 1;

/// A rendered UE configuration keyed by its UE id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UeConfigArtifact {
    /// UE the configuration belongs to
    pub id: UeId,
    /// Rendered YAML document
    pub content: String,
}

impl UeConfigArtifact {
    /// File name of the persisted artifact, `ue<id>.yaml`
    pub fn file_name(&self) -> String {
        super::artifact_file_name(self.id)
    }
}

/// Subscriber permanent identifier: IMSI with the MSIN zero-padded to 10 digits
pub fn supi(id: UeId) -> String {
    format!("imsi-{MCC}{MNC}{:010}", id.get())
}

/// 15-digit IMEI with the id in the serial-number digits
pub fn imei(id: UeId) -> String {
    format!("35693803{:07}", id.get())
}

/// 16-digit IMEISV with the id in the serial-number digits
pub fn imei_sv(id: UeId) -> String {
    format!("43708161{:08}", id.get())
}

/// Render the configuration for a UE
///
/// Pure and deterministic: the same id always yields byte-identical output.
pub fn render(id: UeId) -> UeConfigArtifact {
    let sd = id.get();
    let dnn = dnn_name(id);
    let mut out = String::with_capacity(1024);

    // Writing to a String cannot fail
    let _ = writeln!(out, "# UERANSIM UE configuration for ue{id}");
    let _ = writeln!(out, "supi: '{}'", supi(id));
    let _ = writeln!(out, "mcc: '{MCC}'");
    let _ = writeln!(out, "mnc: '{MNC}'");
    out.push_str(concat!(
        "key: '8baf473f2f8fd09487cccbd7097c6862'\n",
        "op: '8e27b6af0e692e750f32667a3b14605d'\n",
        "opType: 'OPC'\n",
        "amf: '8000'\n",
    ));
    let _ = writeln!(out, "imei: '{}'", imei(id));
    let _ = writeln!(out, "imeiSv: '{}'", imei_sv(id));
    out.push_str(concat!(
        "gnbSearchList:\n",
        "  - gnb-service\n",
        "uacAic:\n",
        "  mps: false\n",
        "  mcs: false\n",
        "uacAcc:\n",
        "  normalClass: 0\n",
        "  class11: false\n",
        "  class12: false\n",
        "  class13: false\n",
        "  class14: false\n",
        "  class15: false\n",
        "sessions:\n",
        "  - type: 'IPv4'\n",
    ));
    let _ = writeln!(out, "    apn: '{dnn}'");
    out.push_str("    slice:\n");
    let _ = writeln!(out, "      sst: {SST}");
    let _ = writeln!(out, "      sd: {sd}");
    out.push_str("configured-nssai:\n");
    let _ = writeln!(out, "  - sst: {SST}");
    let _ = writeln!(out, "    sd: {sd}");
    out.push_str("default-nssai:\n");
    let _ = writeln!(out, "  - sst: {SST}");
    let _ = writeln!(out, "    sd: {sd}");
    out.push_str(concat!(
        "integrity:\n",
        "  IA1: true\n",
        "  IA2: true\n",
        "  IA3: true\n",
        "ciphering:\n",
        "  EA1: true\n",
        "  EA2: true\n",
        "  EA3: true\n",
        "integrityMaxRate:\n",
        "  uplink: 'full'\n",
        "  downlink: 'full'\n",
    ));

    UeConfigArtifact { id, content: out }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> UeId {
        UeId::new(n).unwrap()
    }

    #[test]
    fn rendering_is_byte_identical_across_calls() {
        for n in [1, 7, 99, 100, 12345] {
            assert_eq!(render(id(n)), render(id(n)));
        }
    }

    #[test]
    fn different_ids_render_different_documents() {
        assert_ne!(render(id(1)).content, render(id(2)).content);
    }

    #[test]
    fn subscriber_identity_is_zero_padded() {
        assert_eq!(supi(id(1)), "imsi-208930000000001");
        assert_eq!(supi(id(123)), "imsi-208930000000123");
        assert_eq!(supi(id(1)).len(), "imsi-".len() + 15);

        let doc = render(id(1)).content;
        assert!(doc.contains("supi: 'imsi-208930000000001'"));
    }

    #[test]
    fn device_identities_have_fixed_widths() {
        assert_eq!(imei(id(5)), "356938030000005");
        assert_eq!(imei(id(5)).len(), 15);
        assert_eq!(imei_sv(id(5)), "4370816100000005");
        assert_eq!(imei_sv(id(5)).len(), 16);
    }

    #[test]
    fn slice_differentiator_is_the_raw_id() {
        let doc = render(id(42)).content;
        assert!(doc.contains("      sd: 42\n"));
        assert!(doc.contains("configured-nssai:\n  - sst: 1\n    sd: 42\n"));
        assert!(doc.contains("default-nssai:\n  - sst: 1\n    sd: 42\n"));
        assert!(doc.contains("apn: 'dnn-ue42'"));
    }

    #[test]
    fn rendered_document_is_valid_yaml() {
        let doc: serde_yaml::Value = serde_yaml::from_str(&render(id(3)).content).unwrap();

        assert_eq!(doc["supi"].as_str(), Some("imsi-208930000000003"));
        assert_eq!(doc["mcc"].as_str(), Some("208"));
        assert_eq!(doc["sessions"][0]["slice"]["sd"].as_u64(), Some(3));
        assert_eq!(doc["gnbSearchList"][0].as_str(), Some("gnb-service"));
    }

    #[test]
    fn artifact_file_name_follows_the_scan_pattern() {
        assert_eq!(render(id(8)).file_name(), "ue8.yaml");
    }
}
