//! Embedded device nodes for every supported SoC

use super::{CoreNode, DeviceNode};
use crate::gsp::ops::GSP_DT_IDS;
use crate::gsp::GSP_DEVICE_NAME;

/// Load one embedded node per supported compatible string
pub fn load_builtin_nodes() -> Vec<DeviceNode> {
    GSP_DT_IDS
        .iter()
        .filter_map(|(compatible, _)| builtin_node(compatible))
        .collect()
}

/// Embedded node for `compatible`, if the SoC is known
pub fn builtin_node(compatible: &str) -> Option<DeviceNode> {
    let (core_cnt, io_cnt) = match compatible {
        "sprd,gsp-r1p1-sc9830" => (1, 4),
        "sprd,gsp-r3p0-whale2" => (2, 8),
        "sprd,gsp-r4p0-iwhale2" => (2, 8),
        "sprd,gsp-lite_r1p0-sc9833" | "sprd,gsp-lite_r1p0-sharklj1" => (1, 4),
        "sprd,gsp-r5p0-isharkl2" => (1, 8),
        "sprd,gsp-lite_r2p0-sharkle" | "sprd,gsp-lite_r2p0-pike2" => (1, 4),
        "sprd,gsp-r6p0-sharkl3" => (1, 8),
        "sprd,gsp-lite_r3p0-sharkl5" => (1, 4),
        _ => return None,
    };

    Some(DeviceNode {
        compatible: compatible.to_string(),
        name: Some(GSP_DEVICE_NAME.to_string()),
        core_cnt: Some(core_cnt),
        io_cnt: Some(io_cnt),
        cores: (0..core_cnt)
            .map(|id| CoreNode {
                id: Some(id),
                kcfg_num: Some(8),
                status: Some("okay".to_string()),
            })
            .collect(),
    })
}
