//! End-to-end checks: template, applications, binary blob and every
//! textual artifact.

use genmap_blob::{DecodedMapping, MapBlob};
use genmap_core::builder::MappingBuilder;
use genmap_core::entity::{PeriphDesc, TaskDesc, VsegDesc};
use genmap_core::kinds::{PeriphType, VsegMode, VsegType};
use genmap_core::mapping::{Mapping, PlatformParams};
use genmap_export::{available_exports, exporter, ExportKind};
use genmap_platforms::{build_platform, AppKind, ArchConfig};

fn default_platform() -> Mapping {
    build_platform(&ArchConfig::default(), &[AppKind::Shell, AppKind::Sort]).unwrap()
}

#[test]
fn sort_on_two_by_two_grid_with_four_procs() {
    let mapping = build_platform(&ArchConfig::default(), &[AppKind::Sort]).unwrap();
    let bytes = MapBlob::new(&mapping).to_bytes().unwrap();
    let decoded = DecodedMapping::from_bytes(&bytes).unwrap();

    assert_eq!(decoded.header.totals.tasks, 16);
    assert_eq!(decoded.header.totals.procs, 16);
    assert_eq!(decoded.tasks.len(), 16);

    let vspace = &decoded.vspaces[0];
    let vsegs = vspace.vseg_offset..vspace.vseg_offset + vspace.vsegs;
    let tasks = vspace.task_offset as usize..(vspace.task_offset + vspace.tasks) as usize;
    for task in &decoded.tasks[tasks] {
        assert!(vsegs.contains(&task.stack_vseg), "{} stack outside vspace", task.name);
        assert!(vsegs.contains(&task.heap_vseg), "{} heap outside vspace", task.name);
        let stack = &decoded.vsegs[task.stack_vseg as usize];
        assert_eq!(stack.name, format!("sort_stack_{}", &task.name["sort_".len()..]));
    }
    assert!(vsegs.contains(&vspace.start_vseg));
    assert_eq!(decoded.vsegs[vspace.start_vseg as usize].name, "sort_data");
}

#[test]
fn task_without_heap_encodes_index_zero() {
    let mut b = genmap_platforms::tsar_generic(&ArchConfig::default()).unwrap();
    let app = b.add_vspace("bare", "bare_data", true);
    b.add_vseg(
        app,
        VsegDesc::new("bare_data", 0x2000_0000, 0x1000, VsegMode::C_WU, VsegType::Elf)
            .binpath("bin/bare/appli.elf"),
    )
    .unwrap();
    b.add_vseg(
        app,
        VsegDesc::new("bare_stack", 0x4000_0000, 0x1000, VsegMode::C_WU, VsegType::Buffer),
    )
    .unwrap();
    b.add_task(app, TaskDesc::new("bare", 0).stack("bare_stack"))
        .unwrap();
    let mapping = b.build();

    let bytes = MapBlob::new(&mapping).to_bytes().unwrap();
    let decoded = DecodedMapping::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.tasks[0].heap_vseg, 0);
    assert_eq!(decoded.vsegs[decoded.tasks[0].stack_vseg as usize].name, "bare_stack");
}

#[test]
fn every_application_resolves_inside_its_own_vspace() {
    let apps = genmap_platforms::available_applications();
    let mapping = build_platform(&ArchConfig::default(), apps).unwrap();
    assert_eq!(mapping.name(), "tsar_shell_sort_transpose_router");

    let bytes = MapBlob::new(&mapping).to_bytes().unwrap();
    let decoded = DecodedMapping::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.vspaces.len(), apps.len());
    for vspace in &decoded.vspaces {
        let vsegs = vspace.vseg_offset..vspace.vseg_offset + vspace.vsegs;
        assert!(vsegs.contains(&vspace.start_vseg), "{} start", vspace.name);
        let tasks = vspace.task_offset as usize..(vspace.task_offset + vspace.tasks) as usize;
        for task in &decoded.tasks[tasks] {
            assert!(vsegs.contains(&task.stack_vseg), "{} stack", task.name);
        }
    }

    let router = decoded.vspaces.iter().find(|v| v.name == "router").unwrap();
    assert_eq!(decoded.vsegs[router.start_vseg as usize].name, "router_data_0");
    let producer = decoded.tasks.iter().find(|t| t.name == "producer").unwrap();
    assert_eq!((producer.startid, producer.heap_vseg), (2, 0));
    assert_eq!(
        decoded.vsegs[producer.stack_vseg as usize].name,
        "router_stack_0_0_0"
    );

    for kind in available_exports() {
        assert!(exporter(*kind).export(&mapping).is_ok(), "{kind} failed");
    }
}

#[test]
fn every_artifact_is_produced_for_the_default_platform() {
    let mapping = default_platform();
    assert_eq!(mapping.name(), "tsar_shell_sort");
    assert!(MapBlob::new(&mapping).to_bytes().is_ok());
    for kind in available_exports() {
        let out = exporter(*kind)
            .export(&mapping)
            .unwrap_or_else(|e| panic!("{kind} failed: {e}"));
        assert!(!out.text.is_empty());
    }
}

#[test]
fn output_is_deterministic() {
    let first = default_platform();
    let second = default_platform();
    assert_eq!(
        MapBlob::new(&first).to_bytes().unwrap(),
        MapBlob::new(&second).to_bytes().unwrap()
    );
    for kind in available_exports() {
        let a = exporter(*kind).export(&first).unwrap();
        let b = exporter(*kind).export(&second).unwrap();
        assert_eq!(a, b, "{kind} differs between runs");
    }
}

#[test]
fn blob_size_matches_header_counts() {
    let mapping = default_platform();
    let blob = MapBlob::new(&mapping);
    let bytes = blob.to_bytes().unwrap();
    assert_eq!(bytes.len(), blob.size());
    let decoded = DecodedMapping::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.header.name, "tsar_shell_sort");
    assert_eq!(decoded.header.totals, mapping.totals());
    assert_eq!(decoded.clusters.len(), 4);
}

#[test]
fn header_reflects_ioc_choice_and_ramdisk() {
    let config = ArchConfig {
        use_ramdisk: true,
        ..ArchConfig::default()
    };
    let mapping = build_platform(&config, &[AppKind::Shell]).unwrap();
    let header = exporter(ExportKind::Header).export(&mapping).unwrap().text;
    assert!(header.contains("#define USE_IOC_RDK            1\n"));
    assert!(header.contains("#define SEG_RDK_BASE           0x2000000\n"));
}

#[test]
fn cluster_without_interrupt_controller_fails_both_device_trees() {
    let mut params = PlatformParams::new("no_xcu", 1, 2, 1);
    params.ram_size = 0x0400_0000;
    let mut b = MappingBuilder::new(params).unwrap();
    b.add_ram("RAM", 0, 0x0400_0000).unwrap();
    b.add_periph("XCU", 0xB000_0000, 0x1000, PeriphDesc::new(PeriphType::Xcu))
        .unwrap();
    b.add_proc(0, 0, 0).unwrap();
    let base = b.mapping().geometry().encode(0, 1);
    b.add_ram("RAM", base, 0x0400_0000).unwrap();
    b.add_periph("TTY", base + 0xB400_0000, 0x1000, PeriphDesc::new(PeriphType::Tty))
        .unwrap();
    let mapping = b.build();

    for kind in [ExportKind::LinuxDts, ExportKind::NetbsdDts] {
        let err = exporter(kind).export(&mapping).unwrap_err();
        assert_eq!(err.to_string(), "No XCU/PIC in cluster(0,1)", "{kind}");
    }
}

#[test]
fn config_file_section_drives_the_template() {
    let config: ArchConfig = toml::from_str(
        r#"
        name = "tiny"
        x-size = 1
        y-size = 1
        nprocs = 2
        ram-size = 0x4000000
        ioc = "SDC"
        "#,
    )
    .unwrap();
    let mapping = build_platform(&config, &[AppKind::Sort]).unwrap();
    assert_eq!(mapping.name(), "tiny_sort");
    assert_eq!(mapping.totals().tasks, 2);
    let header = exporter(ExportKind::Header).export(&mapping).unwrap().text;
    assert!(header.contains("#define USE_IOC_SDC            1\n"));
}
