//! Microsoft Visual C++ toolchain (cl.exe, lib.exe, link.exe, rc.exe, cvtres.exe)

use super::config::{EnvConfig, Target, ToolchainKind};
use super::options::{Artifact, BuildOptions, Crt, Linkage, Profile};
use super::toolchain::{
    CompileJob, Language, LinkPlan, LinkRequest, ResourceJob, ResourcePlan, Toolchain, backslashes, compile_define,
    quoted, sibling_of_object,
};
use crate::process::Invocation;

const DEFAULT_COMPILER: &str = "cl.exe";
const OBJECT_EXT: &str = ".obj";

/// Import libraries every dynamic library and executable links against.
const SYSTEM_LIBRARIES: &[&str] = &[
    "user32", "gdi32", "ws2_32", "ole32", "wininet", "advapi32", "oleaut32", "shell32", "iphlpapi",
];

pub struct Msvc {
    target: Target,
    env: EnvConfig,
}

impl Msvc {
    pub fn new(target: Target, env: EnvConfig) -> Self {
        Self { target, env }
    }

    fn machine(&self) -> &'static str {
        if self.target.is_64bit() { "/MACHINE:X64" } else { "/MACHINE:X86" }
    }

    /// Response-file contents for compiling one source.
    pub fn compile_flags(&self, job: &CompileJob) -> Vec<String> {
        let mut flags: Vec<String> = vec!["/nologo".into()];
        if job.language == Language::Cpp {
            flags.push("/std:c++17".into());
        }
        let lang = match job.language {
            Language::C => "/TC",
            Language::Cpp => "/TP",
        };

        let debug = job.options.profile == Profile::Debug;
        let (profile, runtime) = match (debug, job.options.crt) {
            (false, Crt::Dynamic) => ("RELEASE", "/MD"),
            (false, Crt::Static) => ("RELEASE", "/MT"),
            (true, Crt::Dynamic) => ("DEBUG", "/MDd"),
            (true, Crt::Static) => ("DEBUG", "/MTd"),
        };
        let crt = match job.options.crt {
            Crt::Dynamic => "CRT_DYNAMIC",
            Crt::Static => "CRT_STATIC",
        };
        flags.push(format!("/D{}", compile_define(profile)));
        flags.push(runtime.into());
        flags.push(format!("/D{}", compile_define(crt)));
        if debug {
            flags.extend(["/Zi", "/EHsc", "/GR", lang, "/c"].map(String::from));
        } else {
            flags.extend(["/O2", "/Oi", "/Oy", "/Gy", "/Gd", "/EHsc", "/GR", lang, "/c"].map(String::from));
        }

        let kind = match job.options.linkage {
            Linkage::Static | Linkage::DynamicXStatic => "STATIC_LIBRARY",
            Linkage::Dynamic => "DYNAMIC_LIBRARY",
        };
        flags.push(format!("/D{}", compile_define(kind)));

        for inc in &job.include_paths {
            flags.push(format!("/I{}", quoted(backslashes(inc))));
        }
        for def in &job.defines {
            flags.push(format!("/D{}", quoted(def)));
        }
        let object = backslashes(&job.object);
        if debug {
            let pdb = object.strip_suffix(OBJECT_EXT).unwrap_or(&object);
            flags.push(format!("/Fd{}", quoted(format!("{}.pdb", pdb))));
        }
        if !self.target.is_64bit() {
            flags.push("/arch:SSE2".into());
        }
        flags.push(format!("/Fo{}", quoted(&object)));
        flags.push(quoted(backslashes(&job.source)));
        flags
    }

    /// `/RELEASE` or `/DEBUG` with the matching default runtime library.
    fn runtime_flags(options: BuildOptions) -> &'static str {
        match (options.profile, options.crt) {
            (Profile::Release, Crt::Dynamic) => "/RELEASE /nodefaultlib:libcmt /defaultlib:msvcrt",
            (Profile::Release, Crt::Static) => "/RELEASE /nodefaultlib:msvcrt /defaultlib:libcmt",
            (Profile::Debug, Crt::Dynamic) => "/DEBUG /nodefaultlib:libcmtd /defaultlib:msvcrtd",
            (Profile::Debug, Crt::Static) => "/DEBUG /nodefaultlib:msvcrtd /defaultlib:libcmtd",
        }
    }

    fn link_inputs(request: &LinkRequest<'_>) -> Vec<String> {
        let mut flags: Vec<String> = request.objects.iter().map(|o| quoted(backslashes(o))).collect();
        flags.extend(request.library_paths.iter().map(|p| format!("/LIBPATH:{}", quoted(p))));
        flags.extend(
            request
                .libraries
                .iter()
                .map(|l| format!("{}.lib", l.strip_prefix(':').unwrap_or(l))),
        );
        flags.extend(SYSTEM_LIBRARIES.iter().map(|l| format!("{}.lib", l)));
        flags
    }

    fn archive(&self, request: &LinkRequest<'_>) -> LinkPlan {
        let output = request.lib_path.join(format!("{}.lib", request.name));
        let mut flags = vec![
            "/NOLOGO".to_string(),
            format!("/OUT:{}", quoted(backslashes(&output))),
            self.machine().to_string(),
        ];
        flags.extend(request.objects.iter().map(|o| quoted(backslashes(o))));
        let rsp = request.temp_path.join(format!("{}.obj2lib", request.name));
        LinkPlan {
            output,
            steps: vec![Invocation::new("lib.exe").with_response_file(rsp, flags.join(" "))],
            rebuild_from_scratch: false,
            copy_to: None,
        }
    }

    fn shared_library(&self, request: &LinkRequest<'_>) -> LinkPlan {
        let name = request.name;
        let output = match request.version {
            Some(v) => request.bin_path.join(format!("{}-{}.dll", name, v)),
            None => request.bin_path.join(format!("{}.dll", name)),
        };
        let entry = if self.target.is_64bit() {
            "/ENTRY:_DllMainCRTStartup"
        } else {
            "/ENTRY:_DllMainCRTStartup@12"
        };

        let mut flags = vec![
            "/NOLOGO".to_string(),
            format!("/OUT:{}", quoted(backslashes(&output))),
            self.machine().to_string(),
            entry.to_string(),
            "/DLL /INCREMENTAL:NO /OPT:REF /OPT:ICF".to_string(),
            Self::runtime_flags(request.options).to_string(),
        ];
        if let Some(def) = request.def_file {
            flags.push(format!("/DEF:{}", quoted(def)));
        }
        let implib = request.lib_path.join(format!("{}.lib", name));
        flags.push(format!("/implib:{}", quoted(backslashes(implib))));
        flags.extend(Self::link_inputs(request));

        let rsp = request.temp_path.join(format!("{}.obj2dll", name));
        LinkPlan {
            output,
            steps: vec![Invocation::new("link.exe").with_response_file(rsp, flags.join(" "))],
            rebuild_from_scratch: false,
            copy_to: None,
        }
    }

    fn executable(&self, request: &LinkRequest<'_>) -> LinkPlan {
        let output = request.bin_path.join(format!("{}.exe", request.name));
        let mut flags = vec![
            "/NOLOGO".to_string(),
            format!("/OUT:{}", quoted(backslashes(&output))),
            self.machine().to_string(),
            "/INCREMENTAL:NO /OPT:REF /OPT:ICF".to_string(),
            Self::runtime_flags(request.options).to_string(),
        ];
        flags.extend(Self::link_inputs(request));

        let rsp = request.temp_path.join(format!("{}.obj2exe", request.name));
        LinkPlan {
            output,
            steps: vec![Invocation::new("link.exe").with_response_file(rsp, flags.join(" "))],
            rebuild_from_scratch: false,
            copy_to: None,
        }
    }
}

impl Toolchain for Msvc {
    fn kind(&self) -> ToolchainKind {
        ToolchainKind::Msvc
    }

    fn target(&self) -> Target {
        self.target
    }

    fn object_extension(&self) -> &'static str {
        OBJECT_EXT
    }

    fn artifact_stem(&self, name: &str, artifact: Artifact) -> String {
        match artifact {
            Artifact::StaticLibrary => format!("{}.lib", name),
            Artifact::DynamicLibrary => format!("{}.dll", name),
            Artifact::Executable => format!("{}.exe", name),
        }
    }

    fn compile(&self, job: &CompileJob) -> Invocation {
        let program = match job.language {
            Language::C => self.env.c_compiler(DEFAULT_COMPILER),
            Language::Cpp => self.env.cxx_compiler(DEFAULT_COMPILER),
        };
        let rsp = sibling_of_object(&job.object, OBJECT_EXT, "2obj");
        Invocation::new(program).with_response_file(rsp, self.compile_flags(job).join(" "))
    }

    fn link(&self, request: &LinkRequest<'_>) -> LinkPlan {
        match request.artifact {
            Artifact::StaticLibrary => self.archive(request),
            Artifact::DynamicLibrary => self.shared_library(request),
            Artifact::Executable => self.executable(request),
        }
    }

    fn resource(&self, job: &ResourceJob) -> Option<ResourcePlan> {
        let res_file = sibling_of_object(&job.object, OBJECT_EXT, ".res");

        let mut to_res = Invocation::new("rc.exe").arg("/nologo");
        for inc in &job.include_paths {
            to_res = to_res.args(["/i".to_string(), backslashes(inc)]);
        }
        for def in &job.defines {
            to_res = to_res.args(["/d".to_string(), def.clone()]);
        }
        let to_res = to_res
            .args(["/l", "409", "/z", "MS Sans Serif,Helv/MS Shell Dlg", "/r", "/fo"])
            .arg(backslashes(&res_file))
            .arg(backslashes(&job.rc_file));

        let to_object = Invocation::new("cvtres.exe")
            .arg("/NOLOGO")
            .arg(self.machine())
            .arg(format!("/OUT:{}", backslashes(&job.object)))
            .arg(backslashes(&res_file));

        Some(ResourcePlan {
            res_file,
            to_res,
            to_object,
        })
    }

    fn embeds_resources(&self, artifact: Artifact) -> bool {
        artifact != Artifact::StaticLibrary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::config::{PointerWidth, TargetOs};
    use insta::assert_snapshot;
    use std::path::{Path, PathBuf};

    fn msvc(width: PointerWidth) -> Msvc {
        Msvc::new(
            Target {
                toolchain: ToolchainKind::Msvc,
                os: TargetOs::Windows,
                width,
            },
            EnvConfig::default(),
        )
    }

    fn job(options: BuildOptions) -> CompileJob {
        CompileJob {
            language: Language::Cpp,
            options,
            source: PathBuf::from("source/main.cpp"),
            object: PathBuf::from("temp/tool.exe.1.RDD.main.cpp.obj"),
            defines: vec!["TOOL_INTERNAL".to_string()],
            include_paths: vec!["source/include".to_string()],
        }
    }

    #[test]
    fn test_release_compile_flags() {
        let flags = msvc(PointerWidth::Bits64).compile_flags(&job(BuildOptions::default())).join(" ");
        assert_snapshot!(flags, @r#"/nologo /std:c++17 /DXYO_COMPILE_RELEASE /MD /DXYO_COMPILE_CRT_DYNAMIC /O2 /Oi /Oy /Gy /Gd /EHsc /GR /TP /c /DXYO_COMPILE_DYNAMIC_LIBRARY /I"source\include" /D"TOOL_INTERNAL" /Fo"temp\tool.exe.1.RDD.main.cpp.obj" "source\main.cpp""#);
    }

    #[test]
    fn test_debug_32bit_adds_pdb_and_sse2() {
        let opts = BuildOptions::new(Profile::Debug, Crt::Static, Linkage::Static);
        let flags = msvc(PointerWidth::Bits32).compile_flags(&job(opts));
        assert!(flags.contains(&"/MTd".to_string()));
        assert!(flags.contains(&"/Fd\"temp\\tool.exe.1.RDD.main.cpp.pdb\"".to_string()));
        assert!(flags.contains(&"/arch:SSE2".to_string()));
    }

    #[test]
    fn test_compile_response_file_name() {
        let inv = msvc(PointerWidth::Bits64).compile(&job(BuildOptions::default()));
        assert_eq!(inv.program, "cl.exe");
        let rsp = inv.response_file.unwrap();
        assert_eq!(rsp.path, PathBuf::from("temp/tool.exe.1.RDD.main.cpp2obj"));
    }

    #[test]
    fn test_dll_link_plan() {
        let objects = vec![PathBuf::from("temp/a.obj")];
        let libs = vec![":zlib".to_string(), "xyo".to_string()];
        let plan = msvc(PointerWidth::Bits32).link(&LinkRequest {
            name: "demo",
            bin_path: Path::new("bin"),
            lib_path: Path::new("lib"),
            temp_path: Path::new("temp"),
            artifact: Artifact::DynamicLibrary,
            options: BuildOptions::default(),
            objects: &objects,
            def_file: Some("demo.def"),
            library_paths: &[],
            libraries: &libs,
            version: Some("1"),
        });
        assert_eq!(plan.output, Path::new("bin").join("demo-1.dll"));
        assert_eq!(plan.steps[0].program, "link.exe");
        let rsp = plan.steps[0].response_file.as_ref().unwrap();
        assert_eq!(rsp.path, Path::new("temp").join("demo.obj2dll"));
        assert_snapshot!(rsp.contents, @r#"/NOLOGO /OUT:"bin\demo-1.dll" /MACHINE:X86 /ENTRY:_DllMainCRTStartup@12 /DLL /INCREMENTAL:NO /OPT:REF /OPT:ICF /RELEASE /nodefaultlib:libcmt /defaultlib:msvcrt /DEF:"demo.def" /implib:"lib\demo.lib" "temp\a.obj" zlib.lib xyo.lib user32.lib gdi32.lib ws2_32.lib ole32.lib wininet.lib advapi32.lib oleaut32.lib shell32.lib iphlpapi.lib"#);
    }

    #[test]
    fn test_static_library_uses_lib_exe() {
        let objects = vec![PathBuf::from("temp/a.obj")];
        let plan = msvc(PointerWidth::Bits64).link(&LinkRequest {
            name: "demo.static",
            bin_path: Path::new("bin"),
            lib_path: Path::new("lib"),
            temp_path: Path::new("temp"),
            artifact: Artifact::StaticLibrary,
            options: BuildOptions::new(Profile::Release, Crt::Static, Linkage::Static),
            objects: &objects,
            def_file: None,
            library_paths: &[],
            libraries: &[],
            version: None,
        });
        assert_eq!(plan.steps[0].program, "lib.exe");
        let rsp = plan.steps[0].response_file.as_ref().unwrap();
        assert_eq!(rsp.contents, "/NOLOGO /OUT:\"lib\\demo.static.lib\" /MACHINE:X64 \"temp\\a.obj\"");
    }

    #[test]
    fn test_resource_plan() {
        let plan = msvc(PointerWidth::Bits64)
            .resource(&ResourceJob {
                rc_file: PathBuf::from("res/app.rc"),
                object: PathBuf::from("temp/tool.exe.1.RDD.app.rc.obj"),
                defines: vec!["APP=1".to_string()],
                include_paths: vec![],
            })
            .unwrap();
        assert_eq!(plan.res_file, PathBuf::from("temp/tool.exe.1.RDD.app.rc.res"));
        assert_eq!(plan.to_res.program, "rc.exe");
        assert!(plan.to_res.args.contains(&"APP=1".to_string()));
        assert_eq!(plan.to_object.program, "cvtres.exe");
        assert_eq!(plan.to_object.args[1], "/MACHINE:X64");
    }
}
