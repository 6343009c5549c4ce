// SPDX-License-Identifier: GPL-3.0-only

//! Recording fakes of every host seam, for driving the stage in tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use firstboot_contracts::{
    CommandOutcome, CommandRunner, DeviceWaiter, FileWriter, Mounter, PartitionSpec,
    PartitionTable, PartitionTableOp, ProvisionError, render_command,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Wait {
        devices: Vec<String>,
        context: String,
    },
    Begin(String),
    WipeTable(String),
    CreatePartition(String, PartitionSpec),
    Commit(String),
    Run {
        program: PathBuf,
        args: Vec<String>,
    },
    Mount {
        device: String,
        target: PathBuf,
        fstype: String,
    },
    Unmount(PathBuf),
    WriteFile {
        path: PathBuf,
        contents: String,
        mode: u32,
        uid: u32,
        gid: u32,
    },
}

#[derive(Debug, Default)]
struct Failures {
    wait_contexts: HashSet<String>,
    commit_devices: HashSet<String>,
    programs: HashSet<String>,
    mount: bool,
    mount_attaches: bool,
    unmount: bool,
    write_suffixes: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    mounted: HashSet<PathBuf>,
    failures: Failures,
}

/// Implements every contract trait and records each call in order.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<State>>,
}

impl FakeHost {
    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.lock().unwrap().calls)
    }

    pub fn mount_points(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Mount { target, .. } => Some(target.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn fail_wait_for(&self, context: &str) {
        let mut state = self.state.lock().unwrap();
        state.failures.wait_contexts.insert(context.to_string());
    }

    pub fn fail_commit_on(&self, device: &str) {
        let mut state = self.state.lock().unwrap();
        state.failures.commit_devices.insert(device.to_string());
    }

    /// Fail every run of a program with this file name.
    pub fn fail_program(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.failures.programs.insert(name.to_string());
    }

    /// Fail mounts. With `attached`, the mount stays attached despite the error.
    pub fn fail_mount(&self, attached: bool) {
        let mut state = self.state.lock().unwrap();
        state.failures.mount = true;
        state.failures.mount_attaches = attached;
    }

    pub fn fail_unmount(&self) {
        self.state.lock().unwrap().failures.unmount = true;
    }

    pub fn fail_write_to(&self, suffix: impl Into<PathBuf>) {
        let mut state = self.state.lock().unwrap();
        state.failures.write_suffixes.push(suffix.into());
    }
}

#[async_trait]
impl DeviceWaiter for FakeHost {
    async fn wait(&self, devices: &[String], context: &str) -> Result<(), ProvisionError> {
        self.record(Call::Wait {
            devices: devices.to_vec(),
            context: context.to_string(),
        });

        if self.state.lock().unwrap().failures.wait_contexts.contains(context) {
            return Err(ProvisionError::DeviceTimeout {
                context: context.to_string(),
                missing: devices.to_vec(),
            });
        }
        Ok(())
    }
}

pub struct FakeTableOp {
    host: FakeHost,
    device: String,
}

impl PartitionTable for FakeHost {
    fn begin(&self, device: &str) -> Box<dyn PartitionTableOp> {
        self.record(Call::Begin(device.to_string()));
        Box::new(FakeTableOp {
            host: self.clone(),
            device: device.to_string(),
        })
    }
}

#[async_trait]
impl PartitionTableOp for FakeTableOp {
    fn device(&self) -> &str {
        &self.device
    }

    fn wipe_table(&mut self, wipe: bool) {
        if wipe {
            self.host.record(Call::WipeTable(self.device.clone()));
        }
    }

    fn create_partition(&mut self, partition: PartitionSpec) {
        self.host
            .record(Call::CreatePartition(self.device.clone(), partition));
    }

    async fn commit(&mut self) -> Result<(), ProvisionError> {
        self.host.record(Call::Commit(self.device.clone()));

        let failing = self
            .host
            .state
            .lock()
            .unwrap()
            .failures
            .commit_devices
            .contains(&self.device);
        if failing {
            return Err(ProvisionError::Commit {
                device: self.device.clone(),
                reason: "injected commit failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for FakeHost {
    async fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutcome, ProvisionError> {
        self.record(Call::Run {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });

        let command = render_command(program, args);
        let name = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.state.lock().unwrap().failures.programs.contains(&name) {
            return Err(ProvisionError::ExternalTool {
                command,
                status: Some(1),
                stderr: "injected failure".to_string(),
            });
        }

        Ok(CommandOutcome {
            command,
            ..Default::default()
        })
    }
}

impl Mounter for FakeHost {
    fn mount(&self, device: &str, target: &Path, fstype: &str) -> Result<(), ProvisionError> {
        self.record(Call::Mount {
            device: device.to_string(),
            target: target.to_path_buf(),
            fstype: fstype.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        if state.failures.mount {
            if state.failures.mount_attaches {
                state.mounted.insert(target.to_path_buf());
            }
            return Err(ProvisionError::Mount {
                device: device.to_string(),
                target: target.to_path_buf(),
                reason: "injected mount failure".to_string(),
            });
        }
        state.mounted.insert(target.to_path_buf());
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<(), ProvisionError> {
        self.record(Call::Unmount(target.to_path_buf()));

        let mut state = self.state.lock().unwrap();
        if state.failures.unmount {
            return Err(ProvisionError::Unmount {
                target: target.to_path_buf(),
                reason: "injected unmount failure".to_string(),
            });
        }
        state.mounted.remove(target);
        Ok(())
    }

    fn is_mounted(&self, target: &Path) -> bool {
        self.state.lock().unwrap().mounted.contains(target)
    }
}

impl FileWriter for FakeHost {
    fn write_file(
        &self,
        path: &Path,
        contents: &[u8],
        mode: u32,
        uid: u32,
        gid: u32,
    ) -> Result<(), ProvisionError> {
        self.record(Call::WriteFile {
            path: path.to_path_buf(),
            contents: String::from_utf8_lossy(contents).into_owned(),
            mode,
            uid,
            gid,
        });

        let failing = self
            .state
            .lock()
            .unwrap()
            .failures
            .write_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix));
        if failing {
            return Err(ProvisionError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected write failure"),
            ));
        }
        Ok(())
    }
}

/// A fresh directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "firstboot-{label}-{}",
        uuid::Uuid::new_v4().simple()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
