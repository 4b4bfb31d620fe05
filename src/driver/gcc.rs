//! GCC-compatible toolchain (gcc/g++, ar, windres on MinGW)

use super::config::{EnvConfig, Target, ToolchainKind};
use super::options::{Artifact, BuildOptions, Crt, Linkage, Profile};
use super::toolchain::{
    CompileJob, Language, LinkPlan, LinkRequest, ResourceJob, ResourcePlan, Toolchain, backslashes, compile_define,
    forward_slashes, is_exact_library, is_static_library, quoted, sibling_of_object,
};
use crate::process::Invocation;

const DEFAULT_COMPILER: &str = "gcc";
const OBJECT_EXT: &str = ".o";

pub struct Gcc {
    target: Target,
    env: EnvConfig,
}

impl Gcc {
    pub fn new(target: Target, env: EnvConfig) -> Self {
        Self { target, env }
    }

    fn compiler_for(&self, language: Language) -> &str {
        match language {
            Language::C => self.env.c_compiler(DEFAULT_COMPILER),
            Language::Cpp => self.env.cxx_compiler(DEFAULT_COMPILER),
        }
    }

    fn linker(&self) -> &str {
        self.env.cxx_compiler(DEFAULT_COMPILER)
    }

    /// Response-file contents for compiling one source.
    pub fn compile_flags(&self, job: &CompileJob) -> Vec<String> {
        let mut flags = vec!["-O1".to_string()];
        if job.language == Language::Cpp {
            flags.extend(["-std=c++11", "-std=gnu++11", "-fpermissive"].map(String::from));
        }
        if job.options.is_debug() {
            flags.push("-g".to_string());
        }
        push_config_defines(&mut flags, job.options);

        match job.options.linkage {
            Linkage::Static => flags.push(format!("-D{}", compile_define("STATIC_LIBRARY"))),
            Linkage::Dynamic | Linkage::DynamicXStatic => {
                flags.push("-fpic".to_string());
                if job.language == Language::C || !self.target.is_windows() {
                    flags.push("-rdynamic".to_string());
                }
                let kind = if job.options.linkage == Linkage::DynamicXStatic {
                    "STATIC_LIBRARY"
                } else {
                    "DYNAMIC_LIBRARY"
                };
                flags.push(format!("-D{}", compile_define(kind)));
            }
        }

        for inc in &job.include_paths {
            flags.push(format!("-I{}", quoted(forward_slashes(inc))));
        }
        for def in &job.defines {
            flags.push(format!("-D{}", quoted(def)));
        }
        flags.push("-c".to_string());
        flags.push("-o".to_string());
        flags.push(quoted(forward_slashes(&job.object)));
        flags.push(quoted(forward_slashes(&job.source)));
        flags
    }

    fn library_path_flags(&self, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                let p = if self.target.is_windows() {
                    forward_slashes(p)
                } else {
                    p.clone()
                };
                format!("-L{}", quoted(p))
            })
            .collect()
    }

    fn library_flag(&self, library: &str) -> String {
        if is_static_library(library) {
            if is_exact_library(library) {
                return format!("-l{}.a", library);
            }
            return format!("-l{}", strip_lib_prefix(library));
        }
        if is_exact_library(library) {
            let ext = if self.target.is_windows() { "dll" } else { "so" };
            return format!("-l{}.{}", library, ext);
        }
        format!("-l{}", strip_lib_prefix(library))
    }

    fn link_inputs(&self, request: &LinkRequest<'_>) -> Vec<String> {
        let mut flags: Vec<String> = request.objects.iter().map(|o| quoted(forward_slashes(o))).collect();
        flags.extend(self.library_path_flags(request.library_paths));
        flags.extend(request.libraries.iter().map(|l| self.library_flag(l)));
        flags
    }

    fn runtime_libraries(&self, options: BuildOptions, artifact: Artifact) -> Vec<String> {
        let mut flags: Vec<&str> = Vec::new();
        if self.target.is_windows() {
            if artifact == Artifact::Executable && options.crt == Crt::Static {
                flags.extend([
                    "-static-libstdc++",
                    "-static-libgcc",
                    "-Wl,-Bstatic",
                    "-lstdc++",
                    "-lpthread",
                    "-lm",
                    "-Wl,-Bdynamic",
                ]);
            } else {
                flags.extend(["-lstdc++", "-lpthread", "-lm"]);
            }
            flags.extend(["-luser32", "-lws2_32"]);
        } else {
            flags.extend(["-lstdc++", "-lpthread", "-lm", "-ldl"]);
        }
        flags.into_iter().map(String::from).collect()
    }

    fn archive(&self, request: &LinkRequest<'_>) -> LinkPlan {
        let output = request.lib_path.join(format!("{}.a", request.name));
        let out = forward_slashes(&output);
        let steps = request
            .objects
            .iter()
            .map(|obj| Invocation::new("ar").args(["qcs".to_string(), out.clone(), forward_slashes(obj)]))
            .collect();
        LinkPlan {
            output,
            steps,
            rebuild_from_scratch: true,
            copy_to: None,
        }
    }

    fn shared_library(&self, request: &LinkRequest<'_>) -> LinkPlan {
        let name = request.name;
        let windows = self.target.is_windows();
        let output = match (windows, request.version) {
            (true, Some(v)) => request.bin_path.join(format!("{}-{}.dll", name, v)),
            (true, None) => request.bin_path.join(format!("{}.dll", name)),
            (false, Some(v)) => request.bin_path.join(format!("{}.so.{}", name, v)),
            (false, None) => request.bin_path.join(format!("{}.so", name)),
        };

        let mut rpath = "-Wl,-rpath='$ORIGIN'".to_string();
        if let Some(v) = request.version {
            if windows {
                rpath.push_str(&format!(",-soname,{}-{}.dll", name, v));
            } else {
                rpath.push_str(&format!(",-soname,{}.so.{}", name, v));
            }
        }

        let mut flags = vec!["-shared".to_string(), "-o".to_string(), quoted(forward_slashes(&output)), rpath];
        flags.extend(self.link_inputs(request));
        flags.extend(self.runtime_libraries(request.options, Artifact::DynamicLibrary));

        let rsp = request.temp_path.join(format!("{}.o2so", name));
        let ext = if windows { "dll" } else { "so" };
        let copy = request.lib_path.join(format!("{}.{}", name, ext));
        LinkPlan {
            steps: vec![Invocation::new(self.linker()).with_response_file(rsp, flags.join(" "))],
            copy_to: (copy != output).then_some(copy),
            output,
            rebuild_from_scratch: false,
        }
    }

    fn executable(&self, request: &LinkRequest<'_>) -> LinkPlan {
        let mut file = request.name.to_string();
        if self.target.is_windows() && !file.ends_with(".exe") {
            file.push_str(".exe");
        }
        let output = request.bin_path.join(file);

        let mut flags = vec![
            "-o".to_string(),
            quoted(forward_slashes(&output)),
            "-Wl,-rpath='$ORIGIN'".to_string(),
        ];
        flags.extend(self.link_inputs(request));
        flags.extend(self.runtime_libraries(request.options, Artifact::Executable));

        let rsp = request.temp_path.join(format!("{}.o2elf", request.name));
        LinkPlan {
            output,
            steps: vec![Invocation::new(self.linker()).with_response_file(rsp, flags.join(" "))],
            rebuild_from_scratch: false,
            copy_to: None,
        }
    }
}

impl Toolchain for Gcc {
    fn kind(&self) -> ToolchainKind {
        ToolchainKind::Gcc
    }

    fn target(&self) -> Target {
        self.target
    }

    fn object_extension(&self) -> &'static str {
        OBJECT_EXT
    }

    fn artifact_stem(&self, name: &str, artifact: Artifact) -> String {
        match artifact {
            Artifact::StaticLibrary => format!("{}.a", name),
            Artifact::DynamicLibrary => format!("{}.so", name),
            Artifact::Executable => name.to_string(),
        }
    }

    fn compile(&self, job: &CompileJob) -> Invocation {
        let rsp = sibling_of_object(&job.object, OBJECT_EXT, "2o");
        Invocation::new(self.compiler_for(job.language)).with_response_file(rsp, self.compile_flags(job).join(" "))
    }

    fn link(&self, request: &LinkRequest<'_>) -> LinkPlan {
        match request.artifact {
            Artifact::StaticLibrary => self.archive(request),
            Artifact::DynamicLibrary => self.shared_library(request),
            Artifact::Executable => self.executable(request),
        }
    }

    fn resource(&self, job: &ResourceJob) -> Option<ResourcePlan> {
        if !self.target.is_windows() {
            return None;
        }
        let res_file = sibling_of_object(&job.object, OBJECT_EXT, ".res");

        let mut to_res = Invocation::new("windres");
        for inc in &job.include_paths {
            to_res = to_res.args(["-I".to_string(), backslashes(inc)]);
        }
        for def in &job.defines {
            to_res = to_res.args(["--define".to_string(), def.clone()]);
        }
        let to_res = to_res
            .args(["-l", "409", "-J", "rc", "-O", "res", "-o"])
            .arg(forward_slashes(&res_file))
            .arg("-i")
            .arg(forward_slashes(&job.rc_file));

        let to_object = Invocation::new("windres")
            .args(["-J", "res", "-O", "coff", "-o"])
            .arg(backslashes(&job.object))
            .arg("-i")
            .arg(backslashes(&res_file));

        Some(ResourcePlan {
            res_file,
            to_res,
            to_object,
        })
    }

    fn embeds_resources(&self, artifact: Artifact) -> bool {
        self.target.is_windows() && artifact != Artifact::StaticLibrary
    }
}

fn push_config_defines(flags: &mut Vec<String>, options: BuildOptions) {
    let profile = match options.profile {
        Profile::Release => "RELEASE",
        Profile::Debug => "DEBUG",
    };
    flags.push(format!("-D{}", compile_define(profile)));
    let crt = match options.crt {
        Crt::Static => "CRT_STATIC",
        Crt::Dynamic => "CRT_DYNAMIC",
    };
    flags.push(format!("-D{}", compile_define(crt)));
}

/// `-l` looks up `lib<name>`, so a leading `lib` is dropped.
fn strip_lib_prefix(library: &str) -> &str {
    library.strip_prefix("lib").unwrap_or(library)
}
