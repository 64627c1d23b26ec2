//! os64 build tasks
//!
//! Every public task is a `task_*` function listed in [`TASKS`]. Bodies only
//! decide *whether* to run something; the work itself is done by external
//! tools through [`Context::run`].

use crate::error::{ConfigResult, ExecutionError, Result};
use crate::runner::{escape, Cmd, Context, Registry, TaskDef};
use crate::task_def;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Every task the build knows about
pub const TASKS: &[TaskDef] = &[
    task_def!(task_clean, "Clean build directory"),
    task_def!(task_kernel_objs, "Build kernel objects"),
    task_def!(task_nf_objs, "Build nf objects"),
    task_def!(task_kernel, "Build kernel image", after: ["kernel-objs", "nf-objs"]),
    task_def!(task_fs_images, "Build apps/data filesystem images"),
    task_def!(task_disk_image, "Build disk image"),
    task_def!(
        task_install,
        "Install kernel, apps/data filesystems and GRUB config on the disk image",
        after: ["kernel", "fs-images", "disk-image"]
    ),
    task_def!(task_qemu, "Launch in QEMU", after: ["install"]),
    task_def!(task_bochs, "Launch in Bochs", after: ["install"]),
];

/// Build the registry of all os64 tasks
pub fn registry() -> ConfigResult<Registry> {
    Registry::from_defs(TASKS)
}

/// Build subdirectories removed by `clean`
const BUILD_SUBDIRS: &[&str] = &["kernel", "gui", "libc", "loader", "nf"];

/// Source directories compiled into kernel objects
const KERNEL_SUBDIRS: &[&str] = &["kernel", "gui", "libc", "loader"];

/// Object directories linked into the kernel image, in link order
const LINK_SUBDIRS: &[&str] = &["loader", "gui", "libc", "kernel", "nf"];

/// Keystrokes for fdisk: new DOS label, one bootable primary partition from sector 2048
const FDISK_SCRIPT: &str = "o\nn\np\n1\n2048\n\na\nw\n";

/// Time given to the kernel to finish a mount before the next step touches it
const MOUNT_SETTLE: Duration = Duration::from_millis(500);

/// Clean build directory
pub fn task_clean(ctx: &Context) -> Result<()> {
    for subdir in BUILD_SUBDIRS {
        ctx.run(
            &Cmd::new("rm")
                .arg("-rf")
                .arg("{BUILD_DIR}/{subdir}")
                .with("subdir", *subdir),
        )?;
    }
    Ok(())
}

/// Build kernel objects
pub fn task_kernel_objs(ctx: &Context) -> Result<()> {
    let headers = collect(ctx, &["{BASE_DIR}/include/*/*.h", "{BASE_DIR}/nf/include/*.h"])?;

    for subdir in KERNEL_SUBDIRS {
        ctx.makedir(&format!("{{BUILD_DIR}}/{}", subdir))?;

        for src in ctx.glob(&format!("{{BASE_DIR}}/{}/*.c", subdir))?.iter() {
            let obj = object_path(ctx, &src)?;
            let cmd = Cmd::new("{CC}")
                .flags("{CFLAGS}")
                .arg("-c")
                .arg("{src}")
                .arg("-o")
                .arg("{obj}");
            compile(ctx, &src, &obj, &headers, cmd)?;
        }

        for src in ctx.glob(&format!("{{BASE_DIR}}/{}/*.s", subdir))?.iter() {
            let obj = object_path(ctx, &src)?;
            let cmd = Cmd::new("{NASM}")
                .args(["-f", "elf64"])
                .arg("{src}")
                .arg("-o")
                .arg("{obj}");
            compile(ctx, &src, &obj, &headers, cmd)?;
        }
    }

    Ok(())
}

/// Build nf objects
pub fn task_nf_objs(ctx: &Context) -> Result<()> {
    ctx.makedir("{BUILD_DIR}/nf")?;

    let headers = collect(ctx, &["{BASE_DIR}/include/*/*.h", "{BASE_DIR}/nf/src/*.h"])?;
    let build_dir = ctx.path("{BUILD_DIR}/nf")?;

    for pattern in ["{BASE_DIR}/nf/src/*.c", "{BASE_DIR}/nf/src/os64/*.c"] {
        for src in ctx.glob(pattern)?.iter() {
            let Some(name) = src.file_name() else {
                continue;
            };
            let mut obj_name = name.to_os_string();
            obj_name.push(".o");
            let obj = build_dir.join(obj_name);

            let cmd = Cmd::new("{CC}")
                .flags("{CFLAGS}")
                .args(["-DNF_PLAT_OS64", "-DNF_PRINTF", "-c"])
                .arg("{src}")
                .arg("-o")
                .arg("{obj}");
            compile(ctx, &src, &obj, &headers, cmd)?;
        }
    }

    Ok(())
}

/// Build kernel image
pub fn task_kernel(ctx: &Context) -> Result<()> {
    let mut objs = Vec::new();
    for subdir in LINK_SUBDIRS {
        objs.extend(ctx.glob(&format!("{{BUILD_DIR}}/{}/*.o", subdir))?.to_strings());
    }

    ctx.run(
        &Cmd::new("{LD}")
            .flags("{LDFLAGS}")
            .args(objs)
            .arg("-o")
            .arg("{BUILD_DIR}/kernel.elf"),
    )
}

/// Build apps/data filesystem images
pub fn task_fs_images(ctx: &Context) -> Result<()> {
    ctx.makedir("{BUILD_DIR}")?;
    for image in ["apps", "data"] {
        ctx.run(
            &Cmd::new("genromfs")
                .args(["-d", "{BASE_DIR}/{image}", "-f", "{BUILD_DIR}/{image}.img"])
                .with("image", image),
        )?;
    }
    Ok(())
}

/// Build disk image
///
/// Formats a fresh image, so it never touches one that already exists.
pub fn task_disk_image(ctx: &Context) -> Result<()> {
    if ctx.exists("{DISK_IMAGE}")? {
        ctx.print_task_skip("disk-image", "disk image already exists");
        return Ok(());
    }

    // leftovers from an interrupted run
    ctx.makedir("{MOUNT_DIR}")?;
    ctx.run(&sudo(["umount", "{MOUNT_DIR}"]).quiet().ignore_error())?;
    ctx.run(&sudo(["losetup", "-d", "{LOOP_DEVICE}"]).quiet().ignore_error())?;

    // blank image with a single partition
    ctx.makedir("{BUILD_DIR}")?;
    ctx.run(&Cmd::new("dd").args(["if=/dev/zero", "of={DISK_IMAGE}", "bs=1M", "count=32"]))?;
    ctx.run(&Cmd::new("chmod").args(["666", "{DISK_IMAGE}"]))?;
    ctx.run(&Cmd::new("fdisk").arg("{DISK_IMAGE}").stdin(FDISK_SCRIPT))?;
    ctx.run(&sudo(["losetup", "{LOOP_DEVICE}", "-P", "{DISK_IMAGE}"]))?;

    // ext2 filesystem
    ctx.run(&sudo(["mkfs.ext2", "{LOOP_DEVICE}p1"]))?;
    ctx.run(&sudo(["fsck", "-fy", "{LOOP_DEVICE}p1"]))?;
    ctx.run(&sudo(["mount", "-o", "sync", "{LOOP_DEVICE}p1", "{MOUNT_DIR}"]))?;
    settle(ctx);

    ctx.run(&sudo([
        "grub-install",
        "--no-floppy",
        "--modules=part_msdos multiboot ext2",
        "--boot-directory={MOUNT_DIR}/boot/",
        "{LOOP_DEVICE}",
    ]))?;

    ctx.run(&sudo(["umount", "{MOUNT_DIR}"]))?;
    ctx.run(&sudo(["losetup", "-d", "{LOOP_DEVICE}"]))
}

/// Install kernel, apps/data filesystems and GRUB config on the disk image
pub fn task_install(ctx: &Context) -> Result<()> {
    ctx.makedir("{MOUNT_DIR}")?;
    ctx.run(&sudo(["umount", "{MOUNT_DIR}"]).quiet().ignore_error())?;
    ctx.run(&sudo([
        "mount",
        "-o",
        "loop,offset={DISK_FS_OFFSET}",
        "{DISK_IMAGE}",
        "{MOUNT_DIR}",
    ]))?;
    settle(ctx);

    ctx.makedir("{MOUNT_DIR}/boot/grub")?;
    ctx.run(&sudo(["cp", "{BASE_DIR}/misc/grub.cfg", "{MOUNT_DIR}/boot/grub"]))?;
    for file in ["kernel.elf", "apps.img", "data.img"] {
        ctx.run(&sudo(["cp", "{BUILD_DIR}/{file}", "{MOUNT_DIR}"]).with("file", file))?;
    }

    ctx.run(&sudo(["umount", "{MOUNT_DIR}"]))
}

/// Launch in QEMU
pub fn task_qemu(ctx: &Context) -> Result<()> {
    ctx.run(&Cmd::new("{QEMU}").args(["-hda", "{DISK_IMAGE}", "-m", "64"]))
}

/// Launch in Bochs
pub fn task_bochs(ctx: &Context) -> Result<()> {
    write_bochsrc(ctx)?;
    ctx.run(&Cmd::new("bochs").args([
        "-f",
        "{BUILD_DIR}/bochsrc",
        "-rc",
        "{BASE_DIR}/misc/bochscmd",
    ]))
}

/// Copy `misc/bochsrc` into the build directory with local paths filled in
pub fn write_bochsrc(ctx: &Context) -> Result<PathBuf> {
    let template_path = ctx.path("{BASE_DIR}/misc/bochsrc")?;
    let output_path = ctx.path("{BUILD_DIR}/bochsrc")?;

    let contents = fs::read_to_string(&template_path).map_err(|source| ExecutionError::File {
        path: template_path.clone(),
        source,
    })?;
    let contents = contents
        .replace("DISK_IMAGE", ctx.config.require("DISK_IMAGE")?)
        .replace("SERIAL_OUT", ctx.config.require("SERIAL_OUT")?);

    ctx.print_debug(&format!("Writing {}", output_path.display()));
    if !ctx.dry_run {
        ctx.makedir("{BUILD_DIR}")?;
        fs::write(&output_path, contents).map_err(|source| ExecutionError::File {
            path: output_path.clone(),
            source,
        })?;
    }

    Ok(output_path)
}

fn sudo<I>(args: I) -> Cmd
where
    I: IntoIterator<Item = &'static str>,
{
    Cmd::new("sudo").args(args)
}

fn settle(ctx: &Context) {
    if !ctx.dry_run {
        thread::sleep(MOUNT_SETTLE);
    }
}

/// All files matching any of `patterns`
fn collect(ctx: &Context, patterns: &[&str]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for pattern in patterns {
        files.extend(ctx.glob(pattern)?.to_strings());
    }
    Ok(files)
}

/// Where the object for `src` goes: same relative path under the build dir, `.o` appended
pub fn object_path(ctx: &Context, src: &Path) -> Result<PathBuf> {
    let base_dir = ctx.config.base_dir();
    let build_dir = ctx.path("{BUILD_DIR}")?;

    let relative = src
        .strip_prefix(base_dir)
        .map_err(|_| ExecutionError::OutsideBaseDir(src.to_path_buf()))?;
    let mut obj = build_dir.join(relative).into_os_string();
    obj.push(".o");
    Ok(PathBuf::from(obj))
}

/// Run `cmd` unless `obj` is newer than `src` and every header
///
/// `{src}` and `{obj}` in the command are filled in here.
fn compile(ctx: &Context, src: &Path, obj: &Path, headers: &[String], cmd: Cmd) -> Result<()> {
    let src = src.display().to_string();
    let obj = obj.display().to_string();

    let mut sources = headers.to_vec();
    sources.push(escape(&src));

    if ctx.is_up_to_date(&escape(&obj), &sources)? {
        ctx.print_debug(&format!("Up to date: {}", obj));
        return Ok(());
    }

    ctx.run(&cmd.with("src", src).with("obj", obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigBuilder};
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn touch(path: &Path, secs: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = File::create(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn config(dir: &TempDir) -> Config {
        ConfigBuilder::new(dir.path()).build().unwrap()
    }

    #[test]
    fn test_registry_lists_all_tasks() {
        let registry = registry().unwrap();
        let names: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "bochs",
                "clean",
                "disk-image",
                "fs-images",
                "install",
                "kernel",
                "kernel-objs",
                "nf-objs",
                "qemu"
            ]
        );

        let install = registry.get("install").unwrap();
        assert_eq!(install.prerequisites, vec!["kernel", "fs-images", "disk-image"]);
        assert_eq!(registry.get("clean").unwrap().description, "Clean build directory");
    }

    #[test]
    fn test_object_path_mirrors_source() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        let ctx = Context::new(&config);

        let obj = object_path(&ctx, &temp_dir.path().join("kernel/vfs.c")).unwrap();
        assert_eq!(obj, temp_dir.path().join("build/kernel/vfs.c.o"));
    }

    #[test]
    fn test_object_path_rejects_outside_source() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        let ctx = Context::new(&config);

        assert!(matches!(
            object_path(&ctx, Path::new("/elsewhere/kernel/vfs.c")),
            Err(crate::error::BuildError::Execution(
                ExecutionError::OutsideBaseDir(_)
            ))
        ));
    }

    #[test]
    fn test_compile_source_with_braces() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("kernel/{x}.c");
        let obj = temp_dir.path().join("build/kernel/{x}.c.o");
        touch(&src, 50);
        touch(&obj, 100);

        let config = config(&temp_dir);
        let ctx = Context::new(&config);

        compile(&ctx, &src, &obj, &[], Cmd::new("false")).unwrap();
    }

    #[test]
    fn test_compile_skips_fresh_objects() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("kernel/a.c");
        let header = temp_dir.path().join("include/kernel/a.h");
        let obj = temp_dir.path().join("build/kernel/a.c.o");
        touch(&src, 50);
        touch(&header, 90);

        let config = config(&temp_dir);
        let ctx = Context::new(&config);
        let headers = vec![header.display().to_string()];

        // stale: the command runs and produces the object
        compile(&ctx, &src, &obj, &headers, Cmd::new("touch").arg("{obj}")).unwrap();
        assert!(obj.exists());

        // fresh: a failing command is never started
        touch(&obj, 100);
        compile(&ctx, &src, &obj, &headers, Cmd::new("false")).unwrap();

        // header touched after the object: stale again
        touch(&header, 150);
        assert!(compile(&ctx, &src, &obj, &headers, Cmd::new("false")).is_err());
    }

    #[test]
    fn test_clean_removes_build_subdirs() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("build/kernel/a.c.o"), 1);
        touch(&temp_dir.path().join("build/nf/b.c.o"), 1);
        touch(&temp_dir.path().join("build/disk.img"), 1);

        let config = config(&temp_dir);
        let ctx = Context::new(&config).with_verbosity(crate::runner::Verbosity::Quiet);
        task_clean(&ctx).unwrap();

        assert!(!temp_dir.path().join("build/kernel").exists());
        assert!(!temp_dir.path().join("build/nf").exists());
        assert!(temp_dir.path().join("build/disk.img").exists());
    }

    #[test]
    fn test_disk_image_left_alone_when_present() {
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("build/disk.img");
        fs::create_dir_all(image.parent().unwrap()).unwrap();
        fs::write(&image, b"partitioned").unwrap();

        let config = config(&temp_dir);
        let ctx = Context::new(&config);
        task_disk_image(&ctx).unwrap();

        assert_eq!(fs::read(&image).unwrap(), b"partitioned");
        assert!(!temp_dir.path().join("tmp/mnt").exists());
    }

    #[test]
    fn test_write_bochsrc() {
        let temp_dir = TempDir::new().unwrap();
        let misc = temp_dir.path().join("misc");
        fs::create_dir_all(&misc).unwrap();
        fs::write(
            misc.join("bochsrc"),
            "ata0-master: type=disk, path=DISK_IMAGE\ncom1: enabled=1, mode=file, dev=SERIAL_OUT\n",
        )
        .unwrap();

        let config = config(&temp_dir);
        let ctx = Context::new(&config);
        let written = write_bochsrc(&ctx).unwrap();

        let contents = fs::read_to_string(written).unwrap();
        assert!(contents.contains(&format!(
            "path={}",
            temp_dir.path().join("build/disk.img").display()
        )));
        assert!(contents.contains(&format!(
            "dev={}",
            temp_dir.path().join("tmp/serial.out").display()
        )));
    }

    #[test]
    fn test_write_bochsrc_missing_template() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        let ctx = Context::new(&config);

        assert!(write_bochsrc(&ctx).is_err());
    }

    #[test]
    fn test_dry_run_kernel_objs_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("kernel/a.c"), 1);
        touch(&temp_dir.path().join("loader/boot.s"), 1);

        let config = config(&temp_dir);
        let ctx = Context::new(&config).with_dry_run(true);
        task_kernel_objs(&ctx).unwrap();

        assert!(!temp_dir.path().join("build").exists());
    }
}
