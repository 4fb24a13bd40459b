//! GLSL sources of the terrain program. The fragment stages follow
//! `shade::COMPOSITE_ORDER`; uniform names match `TerrainShader` in the
//! raylib backend.

pub const TERRAIN_VS: &str = r#"
#version 330
in vec3 vertexPosition;
in vec3 vertexNormal;
in vec2 vertexTexCoord;
in vec2 vertexTexCoord2;
in vec4 vertexColor;

uniform mat4 mvp;

out vec3 vary_position;
out vec3 vary_normal;
out vec2 vary_detail_uv;
out vec2 vary_alpha_uv;
out vec3 vary_mccv;

void main()
{
    vary_position = vertexPosition;
    vary_normal = vertexNormal;
    vary_detail_uv = vertexTexCoord;
    vary_alpha_uv = vertexTexCoord2;
    // 127 in the colour buffer is a neutral vertex colour.
    vary_mccv = vertexColor.rgb * (255.0 / 127.0);
    gl_Position = mvp * vec4(vertexPosition, 1.0);
}
"#;

pub const TERRAIN_FS: &str = r#"
#version 330
in vec3 vary_position;
in vec3 vary_normal;
in vec2 vary_detail_uv;
in vec2 vary_alpha_uv;
in vec3 vary_mccv;

// rgb: alpha of layers 1..3, a: shadow
uniform sampler2D alphamap;
uniform sampler2D tex0;
uniform sampler2D tex1;
uniform sampler2D tex2;
uniform sampler2D tex3;

uniform int layer_count;
uniform int has_mccv;
uniform int cant_paint;
uniform int is_impassible;
uniform int draw_areaid_overlay;
uniform vec4 areaid_color;

uniform vec3 camera;
uniform vec3 light_dir;
uniform vec3 diffuse_color;
uniform vec3 ambient_color;

uniform int draw_lines;
uniform int draw_hole_lines;
uniform int draw_contour;

uniform int draw_fog;
uniform vec3 fog_color;
uniform float fogdistance;
uniform float fog_start;

// 0 off, 1 everywhere, 2 around the cursor
uniform int draw_wireframe;
uniform int rainbow_wireframe;
uniform float wireframe_radius;
uniform float wireframe_width;
uniform vec4 wireframe_color;

uniform int draw_cursor_circle;
uniform vec3 cursor_position;
uniform float outer_cursor_radius;
uniform float inner_cursor_ratio;
uniform vec4 cursor_color;

out vec4 out_color;

const float TILESIZE = 533.33333;
const float CHUNKSIZE = TILESIZE / 16.0;
const float UNITSIZE = CHUNKSIZE / 8.0;
const float HOLESIZE = CHUNKSIZE / 4.0;
const float CONTOUR_SPACING = 4.0;

vec4 blend_by_alpha(vec4 src, vec4 dst)
{
    return src * src.a + dst * (1.0 - src.a);
}

float contour_alpha(float unit_size, float pos, float line_width)
{
    float f = abs(fract((pos + unit_size * 0.5) / unit_size) - 0.5);
    float df = abs(line_width / unit_size);
    return df > 0.0 ? smoothstep(0.0, df, f) : 1.0;
}

float contour_alpha(float unit_size, vec2 pos, vec2 line_width)
{
    return 1.0 - min(contour_alpha(unit_size, pos.x, line_width.x),
                     contour_alpha(unit_size, pos.y, line_width.y));
}

vec3 rainbow(vec2 pos)
{
    float h = fract((pos.x + pos.y) / (4.0 * CHUNKSIZE)) * 6.0;
    vec3 k = clamp(abs(mod(h + vec3(0.0, 4.0, 2.0), 6.0) - 3.0) - 1.0, 0.0, 1.0);
    return k;
}

vec4 texture_blend()
{
    if (layer_count == 0) {
        return vec4(1.0);
    }
    vec3 a = texture(alphamap, vary_alpha_uv).rgb;
    a *= vec3(layer_count > 1, layer_count > 2, layer_count > 3);
    float base = max(1.0 - (a.r + a.g + a.b), 0.0);
    vec3 c = texture(tex0, vary_detail_uv).rgb * base
           + texture(tex1, vary_detail_uv).rgb * a.r
           + texture(tex2, vary_detail_uv).rgb * a.g
           + texture(tex3, vary_detail_uv).rgb * a.b;
    return vec4(c, 1.0);
}

void main()
{
    float dist = distance(camera, vary_position);
    if (draw_fog != 0 && dist >= fogdistance) {
        out_color = vec4(fog_color, 1.0);
        return;
    }
    vec3 fw = fwidth(vary_position);

    out_color = texture_blend();
    if (has_mccv != 0) {
        out_color.rgb *= vary_mccv;
    }

    float ndl = max(dot(normalize(vary_normal), normalize(light_dir)), 0.0);
    out_color.rgb *= clamp(diffuse_color * ndl, 0.0, 1.0) + ambient_color;

    if (cant_paint != 0) {
        out_color *= vec4(1.0, 0.0, 0.0, 1.0);
    }
    if (draw_areaid_overlay != 0) {
        out_color = out_color * 0.3 + areaid_color;
    }

    if (is_impassible != 0) {
        out_color = blend_by_alpha(vec4(1.0, 1.0, 1.0, 0.5), out_color);
    }

    float shadow = texture(alphamap, vary_alpha_uv).a;
    out_color = vec4(out_color.rgb * (1.0 - shadow), 1.0);

    if (draw_contour != 0) {
        out_color.rgb *= contour_alpha(CONTOUR_SPACING, vary_position.y, fw.y);
    }

    bool lines_drawn = false;
    if (draw_lines != 0) {
        vec4 color = vec4(0.0);
        color.a = contour_alpha(TILESIZE, vary_position.xz, fw.xz * 1.5);
        color.g = color.a > 0.0 ? 0.8 : 0.0;
        if (color.a == 0.0) {
            color.a = contour_alpha(CHUNKSIZE, vary_position.xz, fw.xz);
            color.r = color.a > 0.0 ? 0.8 : 0.0;
        }
        if (draw_hole_lines != 0 && color.a == 0.0) {
            color.a = contour_alpha(HOLESIZE, vary_position.xz, fw.xz * 0.75);
            color.b = 0.8;
        }
        if (color.a > 0.0) {
            out_color.rgb = blend_by_alpha(color, out_color).rgb;
            lines_drawn = true;
        }
    }

    if (draw_fog != 0) {
        float start = fogdistance * fog_start;
        float a = fogdistance > start ? clamp((dist - start) / (fogdistance - start), 0.0, 1.0) : 0.0;
        out_color = vec4(blend_by_alpha(vec4(fog_color, a), out_color).rgb, 1.0);
    }

    if (draw_wireframe != 0 && !lines_drawn) {
        float radius = max(outer_cursor_radius * wireframe_radius, 2.0 * UNITSIZE);
        if (draw_wireframe == 1 || distance(vary_position.xz, cursor_position.xz) < radius) {
            float alpha = contour_alpha(UNITSIZE, vary_position.xz, fw.xz * wireframe_width);
            float xm = mod(vary_position.x, UNITSIZE);
            float zm = mod(vary_position.z, UNITSIZE);
            float diag = min(abs(xm - zm), abs(xm + zm - UNITSIZE));
            float d = length(fw.xz) * wireframe_width;
            alpha = max(alpha, d > 0.0 ? 1.0 - smoothstep(0.0, d, diag) : 0.0);
            vec4 color = rainbow_wireframe != 0 ? vec4(rainbow(vary_position.xz), 1.0) : wireframe_color;
            out_color.rgb = blend_by_alpha(vec4(color.rgb, color.a * alpha), out_color).rgb;
        }
    }

    if (draw_cursor_circle != 0) {
        float d = length(vary_position.xz - cursor_position.xz);
        float diff = min(abs(d - outer_cursor_radius), abs(d - outer_cursor_radius * inner_cursor_ratio));
        float w = length(fw.xz);
        float alpha = 1.0 - (w > 0.0 ? smoothstep(0.0, w, diff) : 1.0);
        out_color.rgb = blend_by_alpha(vec4(cursor_color.rgb, cursor_color.a * alpha), out_color).rgb;
    }
}
"#;

/// Flat colour program for lines, points, disks and instance boxes.
pub const OVERLAY_VS: &str = r#"
#version 330
in vec3 vertexPosition;
uniform mat4 mvp;
void main()
{
    gl_Position = mvp * vec4(vertexPosition, 1.0);
}
"#;

pub const OVERLAY_FS: &str = r#"
#version 330
uniform vec4 color;
out vec4 out_color;
void main()
{
    out_color = color;
}
"#;
